use anyhow::Result;
use clap::Args;
use console::style;
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;

use kiro_worktree::watch::{ItemEvent, Supervisor, WatchConfig};

use super::Workspace;

/// Watch specs and bugs and report changed items
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Debounce duration in milliseconds (defaults to watch.debounce_ms)
    #[arg(long)]
    pub debounce: Option<u64>,

    /// Patterns to ignore inside item directories (e.g., "*.bak")
    /// Can be specified multiple times
    #[arg(short, long = "ignore")]
    pub ignore: Vec<String>,
}

impl WatchArgs {
    pub async fn execute(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;

        let mut config = WatchConfig::new(workspace.root())
            .with_debounce(self.debounce.unwrap_or(workspace.config.watch.debounce_ms));
        config.ignore_patterns.extend(self.ignore);

        let mut supervisor = Supervisor::new();
        let mut events = supervisor.subscribe();
        supervisor.start(config)?;

        println!(
            "{} Watching items in {} (Ctrl+C to stop)",
            style("👀").cyan(),
            workspace.root().display()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(ItemEvent::Changed { kind, name, paths }) => {
                        println!("{} {} ({} files)", kind, style(&name).bold(), paths.len());
                    }
                    Ok(ItemEvent::Error(message)) => {
                        eprintln!("{} {}", style("watch error:").red(), message);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Dropped {} item events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        supervisor.stop();
        println!("Stopped watching");
        Ok(())
    }
}

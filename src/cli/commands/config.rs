use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::Path;

use kiro_worktree::config::ProjectConfig;

use super::Workspace;

/// Show or initialize the project configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write a default .kiro/worktree.toml
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing config file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

impl ConfigArgs {
    pub async fn execute(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;
        let path = ProjectConfig::path_for(workspace.root());

        if self.init {
            let path = ProjectConfig::init(workspace.root(), self.force)?;
            println!("{} Wrote {}", style("✓").green(), path.display());
            return Ok(());
        }

        let source = if path.exists() { "" } else { " (not present, defaults)" };
        println!("Config file: {}{}", path.display(), style(source).dim());
        println!();
        print!(
            "{}",
            toml::to_string_pretty(&workspace.config).context("Failed to serialize config")?
        );
        Ok(())
    }
}

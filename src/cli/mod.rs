pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{
    config::ConfigArgs, item::ItemArgs, list::ListArgs, start::StartArgs, watch::WatchArgs,
};

/// kiro-worktree - isolate specs and bugs in their own git worktrees
///
/// Items under .kiro/specs and .kiro/bugs can be moved onto a companion
/// branch (feature/{name} or bugfix/{name}) checked out next to the project.
#[derive(Parser, Debug)]
#[command(name = "kiro-worktree")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short, long, global = true, env = "KIRO_PROJECT")]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether an item can be converted to worktree mode
    Check(ItemArgs),

    /// Move an item into its own worktree
    Convert(ItemArgs),

    /// Create a branch and worktree for an item without moving files
    Create(ItemArgs),

    /// Remove an item's worktree and branch
    Remove(ItemArgs),

    /// List worktrees
    List(ListArgs),

    /// Show where an item lives and which worktree it uses
    Status(ItemArgs),

    /// Prepare an item for an automatic run
    Start(StartArgs),

    /// Watch items for changes
    Watch(WatchArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

impl Cli {
    /// Filter directive for the subscriber when RUST_LOG is unset
    pub fn log_level(&self) -> String {
        if self.verbose {
            return "debug".to_string();
        }
        commands::configured_log_level(self.project.as_deref()).unwrap_or_else(|| "info".to_string())
    }

    pub async fn run(self) -> Result<()> {
        let project = self.project.as_deref();
        match self.command {
            Commands::Check(args) => args.check(project).await,
            Commands::Convert(args) => args.convert(project).await,
            Commands::Create(args) => args.create(project).await,
            Commands::Remove(args) => args.remove(project).await,
            Commands::List(args) => args.execute(project).await,
            Commands::Status(args) => args.status(project).await,
            Commands::Start(args) => args.execute(project).await,
            Commands::Watch(args) => args.execute(project).await,
            Commands::Config(args) => args.execute(project).await,
        }
    }
}

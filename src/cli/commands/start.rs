use anyhow::{Context, Result};
use clap::Args;
use console::{style, Emoji};
use std::path::Path;

use kiro_worktree::git::paths::{item_dir, ItemKind};
use kiro_worktree::metadata::MetadataStore;
use kiro_worktree::policy::AutoWorktreePolicy;

use super::Workspace;

/// Prepare an item for an unattended run
///
/// Creates a worktree first when `worktree.auto_bug_worktree` is set (or
/// `--worktree` is given), then prints the directory the run should use.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Item name
    pub name: String,

    /// Item kind (spec or bug)
    #[arg(short, long, default_value = "bug")]
    pub kind: ItemKind,

    /// Create a worktree regardless of the project setting
    #[arg(long)]
    pub worktree: bool,
}

impl StartArgs {
    pub async fn execute(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;

        let enabled = self.worktree
            || (self.kind == ItemKind::Bug && workspace.config.worktree.auto_bug_worktree);
        let policy = AutoWorktreePolicy::new(enabled, self.kind, workspace.repo.clone(), workspace.store.clone());

        let item_path = item_dir(workspace.root(), self.kind, &self.name);
        let metadata_file = item_path.join(self.kind.metadata_file());

        if let Some(field) = policy
            .start_with_auto_worktree(&self.name, &item_path)
            .await
            .with_context(|| format!("Failed to start {} {}", self.kind, self.name))?
        {
            println!(
                "{} {} {} runs on {}",
                Emoji("🌿", "[+]"),
                self.kind,
                style(&self.name).bold(),
                style(&field.branch).cyan()
            );
        }

        let metadata = workspace
            .store
            .read(&metadata_file)
            .await
            .with_context(|| format!("Failed to read {}", metadata_file.display()))?;
        println!("{}", metadata.working_dir(workspace.root()).display());
        Ok(())
    }
}

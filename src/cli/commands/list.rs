use anyhow::Result;
use clap::Args;
use console::style;
use std::path::Path;

use kiro_worktree::git::paths::ItemKind;

use super::Workspace;

/// List the repository's worktrees
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show worktrees on feature/ or bugfix/ branches
    #[arg(long)]
    pub items: bool,
}

impl ListArgs {
    pub async fn execute(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;
        let entries = workspace.repo.list_worktrees().await?;

        let mut shown = 0;
        for entry in &entries {
            let branch = entry.branch.as_deref().unwrap_or("");
            let kind = item_kind_of(branch);
            if self.items && kind.is_none() {
                continue;
            }

            let label = match (kind, entry.detached) {
                (Some(kind), _) => style(kind.to_string()).green(),
                (None, true) => style("detached".to_string()).yellow(),
                (None, false) => style("-".to_string()).dim(),
            };
            println!("{:<10} {:<32} {}", label, branch, entry.path.display());
            shown += 1;
        }

        if shown == 0 {
            println!("No worktrees found");
        }
        Ok(())
    }
}

fn item_kind_of(branch: &str) -> Option<ItemKind> {
    [ItemKind::Spec, ItemKind::Bug]
        .into_iter()
        .find(|kind| branch.starts_with(&format!("{}/", kind.branch_prefix())))
}

use anyhow::{bail, Context, Result};
use clap::Args;
use console::{style, Emoji};
use std::path::Path;

use kiro_worktree::git::paths::{item_dir, locate_item, ItemKind};
use kiro_worktree::git::worktree::WorktreeDescriptor;
use kiro_worktree::metadata::{MetadataError, MetadataStore, WorktreeMode};

use super::Workspace;

/// Selects one spec or bug
#[derive(Args, Debug)]
pub struct ItemArgs {
    /// Item name (directory under .kiro/specs or .kiro/bugs)
    pub name: String,

    /// Item kind (spec or bug)
    #[arg(short, long, default_value = "spec")]
    pub kind: ItemKind,
}

impl ItemArgs {
    /// Report whether the item can be converted, changing nothing
    pub async fn check(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;
        let orchestrator = workspace.orchestrator(self.kind);

        match orchestrator.can_convert(&self.name).await {
            Ok(status) => {
                println!(
                    "{} {} {} can be converted ({})",
                    Emoji("✅", "[OK]"),
                    self.kind,
                    style(&self.name).bold(),
                    status
                );
                Ok(())
            }
            Err(e) => bail!("{} {} cannot be converted: {}", self.kind, self.name, e),
        }
    }

    /// Move the item into its own worktree
    pub async fn convert(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;
        let orchestrator = workspace.orchestrator(self.kind);

        let descriptor = orchestrator
            .convert(&self.name)
            .await
            .with_context(|| format!("Failed to convert {} {}", self.kind, self.name))?;

        println!(
            "{} Converted {} {} to worktree mode",
            Emoji("✅", "[OK]"),
            self.kind,
            style(&self.name).bold()
        );
        print_descriptor(&descriptor);
        Ok(())
    }

    /// Create a bare branch and worktree for the item
    pub async fn create(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;

        let descriptor = workspace
            .repo
            .create_worktree(self.kind, &self.name)
            .await
            .with_context(|| format!("Failed to create worktree for {} {}", self.kind, self.name))?;

        if let Err(e) = workspace
            .repo
            .create_auxiliary_symlinks(&descriptor.absolute_path, &self.name)
            .await
        {
            tracing::warn!("Worktree created without shared directories: {}", e);
        }

        println!("{} Created worktree", Emoji("🌿", "[+]"));
        print_descriptor(&descriptor);
        Ok(())
    }

    /// Remove the item's worktree and its worktree metadata
    pub async fn remove(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;
        let orchestrator = workspace.orchestrator(self.kind);

        orchestrator
            .detach(&self.name)
            .await
            .with_context(|| format!("Failed to remove worktree for {} {}", self.kind, self.name))?;

        println!(
            "{} Removed worktree for {} {}",
            Emoji("🗑️", "[-]"),
            self.kind,
            style(&self.name).bold()
        );
        Ok(())
    }

    /// Show where the item lives and which worktree it uses
    pub async fn status(self, project: Option<&Path>) -> Result<()> {
        let workspace = Workspace::open(project)?;
        let root = workspace.root();
        let location = locate_item(root, self.kind, &self.name);
        let metadata_file = location.join(self.kind.metadata_file());

        println!("{} {}", self.kind, style(&self.name).bold());
        println!("  Location:    {}", location.display());

        let metadata = match workspace.store.read(&metadata_file).await {
            Ok(metadata) => metadata,
            Err(MetadataError::NotFound(_)) => {
                println!("  Metadata:    {}", style("missing").red());
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to read item metadata"),
        };

        let mode = match metadata.mode() {
            WorktreeMode::Normal => style("normal").dim(),
            WorktreeMode::BranchAssigned => style("branch assigned").yellow(),
            WorktreeMode::Isolated => style("worktree").green(),
        };
        println!("  Mode:        {}", mode);
        if let Some(field) = &metadata.worktree {
            println!("  Branch:      {}", field.branch);
            println!("  Created:     {}", field.created_at);
        }
        println!("  Working dir: {}", metadata.working_dir(root).display());

        let main_dir = item_dir(root, self.kind, &self.name);
        if main_dir.exists() {
            let changes = workspace.repo.check_uncommitted_changes(&main_dir).await?;
            if changes.has_changes {
                println!("  Uncommitted: {}", style(changes.files.join(", ")).yellow());
            }
        }

        Ok(())
    }
}

fn print_descriptor(descriptor: &WorktreeDescriptor) {
    println!("  Path:   {}", style(&descriptor.relative_path).cyan());
    println!("  Branch: {}", style(&descriptor.branch).cyan());
}

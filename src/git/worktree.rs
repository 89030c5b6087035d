//! Git worktree management for work-item isolation
//!
//! Each spec or bug can be moved into its own worktree next to the project,
//! checked out on a companion branch (`feature/{name}` or `bugfix/{name}`).

use super::paths::{self, ItemKind, WorktreePaths};
use super::runner::{GitCli, GitRunner};
use super::status::{parse_porcelain, StatusEntry};
use super::{is_valid_ref_name, GitError, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Branches a worktree may be created from
pub const DEFAULT_MAIN_BRANCHES: [&str; 2] = ["main", "master"];

/// Main-tree directories shared into every worktree
pub const DEFAULT_SHARED_DIRS: [&str; 2] = [".kiro/logs", ".kiro/runtime"];

/// Result of creating a worktree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeDescriptor {
    /// Path from the project root, e.g. `../app-worktrees/bugs/my-bug`
    pub relative_path: String,
    /// `relative_path` resolved against the project root
    pub absolute_path: PathBuf,
    /// Fully-qualified branch name
    pub branch: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// One entry of `git worktree list --porcelain`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub head: Option<String>,
    pub branch: Option<String>,
    pub detached: bool,
}

/// Status of one item's files in the main tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UncommittedChanges {
    pub has_changes: bool,
    /// Repository-relative paths reported by git
    pub files: Vec<String>,
    pub raw_status: String,
}

/// Primitive worktree operations for one project
pub struct WorktreeRepository<R: GitRunner = GitCli> {
    project_root: PathBuf,
    runner: R,
    main_branches: Vec<String>,
    shared_dirs: Vec<String>,
}

impl WorktreeRepository<GitCli> {
    /// Open the repository containing `path`, driving the git CLI
    pub fn open(path: &Path) -> Result<Self> {
        let project_root = super::discover_project_root(path)?;
        Ok(Self::with_runner(project_root, GitCli))
    }
}

impl<R: GitRunner> WorktreeRepository<R> {
    /// Create a repository handle with an explicit runner
    pub fn with_runner(project_root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            project_root: project_root.into(),
            runner,
            main_branches: DEFAULT_MAIN_BRANCHES.iter().map(|s| s.to_string()).collect(),
            shared_dirs: DEFAULT_SHARED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_main_branches(mut self, branches: Vec<String>) -> Self {
        if !branches.is_empty() {
            self.main_branches = branches;
        }
        self
    }

    pub fn with_shared_dirs(mut self, dirs: Vec<String>) -> Self {
        self.shared_dirs = dirs;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Get the current branch name
    pub async fn current_branch(&self) -> Result<String> {
        let stdout = self
            .runner
            .run(&self.project_root, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        Ok(stdout.trim().to_string())
    }

    /// Check whether HEAD is on one of the main branches
    pub async fn is_on_main_branch(&self) -> Result<bool> {
        let branch = self.current_branch().await?;
        Ok(self.is_main_branch(&branch))
    }

    pub fn is_main_branch(&self, branch: &str) -> bool {
        self.main_branches.iter().any(|b| b == branch)
    }

    /// Get the path where a worktree for the item would be created
    pub fn worktree_path(&self, kind: ItemKind, name: &str) -> Result<WorktreePaths> {
        paths::worktree_path(&self.project_root, kind, name)
    }

    /// Resolve a project-relative path, rejecting escapes
    pub fn resolve_path(&self, relative: &str) -> Result<PathBuf> {
        paths::resolve_path(&self.project_root, relative)
    }

    /// Create a branch and a worktree for an item
    ///
    /// The branch is created first; if adding the worktree then fails the
    /// branch is deleted again so nothing is left behind.
    pub async fn create_worktree(&self, kind: ItemKind, name: &str) -> Result<WorktreeDescriptor> {
        if !is_valid_ref_name(name) {
            return Err(GitError::InvalidName(name.to_string()));
        }

        let current_branch = self.current_branch().await?;
        if !self.is_main_branch(&current_branch) {
            return Err(GitError::NotOnMainBranch { current_branch });
        }

        let location = self.worktree_path(kind, name)?;
        let branch = kind.branch_name(name);

        let output = self.runner.output(&self.project_root, &["branch", &branch]).await?;
        if !output.success {
            let message = output.message();
            if message.contains("already exists") {
                return Err(GitError::BranchExists(branch));
            }
            return Err(GitError::CommandFailed {
                command: format!("branch {}", branch),
                message,
            });
        }

        let absolute = location.absolute.to_string_lossy().into_owned();
        let output = self
            .runner
            .output(&self.project_root, &["worktree", "add", &absolute, &branch])
            .await?;

        if !output.success {
            let message = output.message();
            self.delete_branch_best_effort(&branch).await;

            if message.contains("already exists") {
                return Err(GitError::WorktreeExists(location.absolute));
            }
            return Err(GitError::CommandFailed {
                command: format!("worktree add {} {}", absolute, branch),
                message,
            });
        }

        tracing::info!("Created worktree {} on branch {}", location.relative, branch);

        Ok(WorktreeDescriptor {
            relative_path: location.relative,
            absolute_path: location.absolute,
            branch,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    async fn delete_branch_best_effort(&self, branch: &str) {
        match self.runner.output(&self.project_root, &["branch", "-D", branch]).await {
            Ok(output) if output.success => {
                tracing::debug!("Rolled back branch {}", branch);
            }
            Ok(output) => {
                tracing::warn!("Failed to roll back branch {}: {}", branch, output.message());
            }
            Err(e) => {
                tracing::warn!("Failed to roll back branch {}: {}", branch, e);
            }
        }
    }

    /// Remove an item's worktree and then its branch
    ///
    /// The worktree is removed with `--force` so uncommitted changes inside
    /// it do not block removal. A branch that cannot be deleted afterwards
    /// is logged and otherwise ignored.
    pub async fn remove_worktree(&self, kind: ItemKind, name: &str) -> Result<()> {
        let location = self.worktree_path(kind, name)?;
        let absolute = location.absolute.to_string_lossy().into_owned();

        self.runner
            .run(&self.project_root, &["worktree", "remove", "--force", &absolute])
            .await?;

        let branch = kind.branch_name(name);
        let soft = self.runner.output(&self.project_root, &["branch", "-d", &branch]).await;
        if matches!(soft, Ok(ref output) if output.success) {
            tracing::info!("Removed worktree {} and branch {}", location.relative, branch);
            return Ok(());
        }

        match self.runner.output(&self.project_root, &["branch", "-D", &branch]).await {
            Ok(output) if output.success => {
                tracing::info!("Removed worktree {} and force-deleted branch {}", location.relative, branch);
            }
            Ok(output) => {
                tracing::warn!(
                    "Removed worktree {} but could not delete branch {}: {}",
                    location.relative,
                    branch,
                    output.message()
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Removed worktree {} but could not delete branch {}: {}",
                    location.relative,
                    branch,
                    e
                );
            }
        }

        Ok(())
    }

    /// Check if a worktree is checked out on the item's branch
    pub async fn worktree_exists(&self, kind: ItemKind, name: &str) -> bool {
        let needle = format!("[{}]", kind.branch_name(name));
        match self.runner.run(&self.project_root, &["worktree", "list"]).await {
            Ok(stdout) => stdout.contains(&needle),
            Err(e) => {
                tracing::debug!("git worktree list failed: {}", e);
                false
            }
        }
    }

    /// List all worktrees of the repository, the main tree included
    pub async fn list_worktrees(&self) -> Result<Vec<WorktreeEntry>> {
        let stdout = self
            .runner
            .run(&self.project_root, &["worktree", "list", "--porcelain"])
            .await?;
        Ok(parse_worktree_list(&stdout))
    }

    /// Report uncommitted changes below one item path only
    pub async fn check_uncommitted_changes(&self, item_path: &Path) -> Result<UncommittedChanges> {
        let relative = item_path
            .strip_prefix(&self.project_root)
            .unwrap_or(item_path)
            .to_string_lossy()
            .into_owned();

        let raw_status = self
            .runner
            .run(
                &self.project_root,
                &[
                    "-c",
                    "core.quotePath=false",
                    "status",
                    "--porcelain",
                    "--untracked-files=all",
                    "--",
                    &relative,
                ],
            )
            .await?;

        let files: Vec<String> = parse_porcelain(&raw_status)
            .into_iter()
            .map(|StatusEntry { path, .. }| path)
            .collect();

        Ok(UncommittedChanges {
            has_changes: !files.is_empty(),
            files,
            raw_status,
        })
    }

    /// Link the main tree's shared directories into a worktree
    ///
    /// Agents running inside the worktree then write to the same log and
    /// runtime directories as agents in the main tree.
    pub async fn create_auxiliary_symlinks(&self, worktree_path: &Path, item_name: &str) -> Result<()> {
        // All entries are checked before anything is touched
        let dirs = self
            .shared_dirs
            .iter()
            .map(|dir| paths::tree_relative(dir))
            .collect::<Result<Vec<_>>>()?;

        for dir in &dirs {
            let target = self.project_root.join(dir);
            let link = worktree_path.join(dir);
            if !link.starts_with(worktree_path) || !target.starts_with(&self.project_root) {
                return Err(GitError::PathEscape(link));
            }

            tokio::fs::create_dir_all(&target).await?;
            replace_with_symlink(&target, &link).await?;
            tracing::debug!("Linked {} -> {}", link.display(), target.display());
        }

        if let Some(logs) = dirs.iter().find(|d| d.ends_with("logs")) {
            tokio::fs::create_dir_all(self.project_root.join(logs).join(item_name)).await?;
        }

        Ok(())
    }
}

async fn replace_with_symlink(target: &Path, link: &Path) -> Result<()> {
    let symlink_error = |source| GitError::Symlink {
        link: link.to_path_buf(),
        source,
    };

    if let Ok(meta) = tokio::fs::symlink_metadata(link).await {
        if meta.file_type().is_symlink() || meta.is_file() {
            tokio::fs::remove_file(link).await.map_err(symlink_error)?;
        } else {
            tracing::warn!("Replacing checked-out directory {} with a symlink", link.display());
            tokio::fs::remove_dir_all(link).await.map_err(symlink_error)?;
        }
    }

    if let Some(parent) = link.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(symlink_error)?;
    }

    #[cfg(unix)]
    tokio::fs::symlink(target, link).await.map_err(symlink_error)?;
    #[cfg(windows)]
    tokio::fs::symlink_dir(target, link).await.map_err(symlink_error)?;

    Ok(())
}

/// Parse `git worktree list --porcelain`
pub fn parse_worktree_list(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            current = Some(WorktreeEntry {
                path: PathBuf::from(path),
                ..Default::default()
            });
        } else if let Some(entry) = current.as_mut() {
            if let Some(head) = line.strip_prefix("HEAD ") {
                entry.head = Some(head.to_string());
            } else if let Some(branch) = line.strip_prefix("branch ") {
                let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
                entry.branch = Some(branch.to_string());
            } else if line == "detached" {
                entry.detached = true;
            }
        }
    }

    if let Some(entry) = current {
        entries.push(entry);
    }

    entries
}

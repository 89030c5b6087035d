use std::path::PathBuf;

use crate::git::GitError;

/// Why a conversion could not be performed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid item name {name:?}: names may not contain spaces, ~^:?*[]\\, '..', '@{{' or start/end with '.'")]
    InvalidName { name: String },

    #[error("Not on main branch (current branch: {current_branch}). Switch to main or master before converting")]
    NotOnMainBranch { current_branch: String },

    #[error("Item not found: {}", path.display())]
    ItemNotFound { path: PathBuf },

    #[error("Already in worktree mode: {path}")]
    AlreadyWorktreeMode { path: String },

    #[error("Implementation already started on branch {branch}; the spec can no longer be moved to a worktree")]
    ImplAlreadyStarted { branch: String },

    #[error("Uncommitted changes; commit these files first: {}", files.join(", "))]
    HasUncommittedChanges { files: Vec<String> },

    #[error("Branch {branch} already exists. Delete it or pick another name")]
    BranchExists { branch: String },

    #[error("Worktree already exists at {}", path.display())]
    WorktreeExists { path: PathBuf },

    #[error("Failed to create worktree: {message}")]
    WorktreeCreateFailed { message: String },

    #[error("Failed to move item files into the worktree: {message}")]
    FileMoveFailed { message: String },

    #[error("Item is not present in the new worktree at {}; check that its files are committed and not ignored", path.display())]
    ItemNotInWorktree { path: PathBuf },

    #[error("Failed to create worktree symlinks: {message}")]
    SymlinkCreateFailed { message: String },

    #[error("Failed to update metadata {}: {message}", path.display())]
    MetadataUpdateFailed { path: PathBuf, message: String },

    #[error("Git error: {message}")]
    Git { message: String },
}

impl ConversionError {
    /// Whether the failing step ran after something had been mutated
    ///
    /// Validation failures never need cleanup; the conversion has already
    /// rolled back what it could for the others.
    pub fn requires_rollback(&self) -> bool {
        matches!(
            self,
            ConversionError::FileMoveFailed { .. }
                | ConversionError::ItemNotInWorktree { .. }
                | ConversionError::SymlinkCreateFailed { .. }
                | ConversionError::MetadataUpdateFailed { .. }
        )
    }

    /// Map a failure of worktree creation
    ///
    /// Failures with their own kind keep it; anything else is a generic
    /// creation failure.
    pub fn from_create(error: GitError) -> Self {
        match error {
            GitError::InvalidName(name) => ConversionError::InvalidName { name },
            GitError::NotOnMainBranch { current_branch } => {
                ConversionError::NotOnMainBranch { current_branch }
            }
            GitError::BranchExists(branch) => ConversionError::BranchExists { branch },
            GitError::WorktreeExists(path) => ConversionError::WorktreeExists { path },
            other => ConversionError::WorktreeCreateFailed {
                message: other.to_string(),
            },
        }
    }
}

impl From<GitError> for ConversionError {
    fn from(error: GitError) -> Self {
        match error {
            GitError::NotOnMainBranch { current_branch } => {
                ConversionError::NotOnMainBranch { current_branch }
            }
            GitError::InvalidName(name) => ConversionError::InvalidName { name },
            other => ConversionError::Git {
                message: other.to_string(),
            },
        }
    }
}

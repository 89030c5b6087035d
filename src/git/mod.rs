//! Git plumbing for worktree isolation
//!
//! Provides the operations the conversion engine needs and nothing more:
//! - Subprocess execution of single git commands (`runner`)
//! - Worktree and item path computation (`paths`)
//! - Porcelain status classification (`status`)
//! - Branch + worktree lifecycle and auxiliary symlinks (`worktree`)

pub mod paths;
pub mod runner;
pub mod status;
pub mod worktree;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Git operation errors
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Invalid name for a git branch: {0:?}")]
    InvalidName(String),

    #[error("Not on main branch (current branch: {current_branch}); switch to main or master first")]
    NotOnMainBranch { current_branch: String },

    #[error("Branch already exists: {0}")]
    BranchExists(String),

    #[error("Worktree already exists: {0}")]
    WorktreeExists(PathBuf),

    #[error("Path escapes the project parent directory: {0}")]
    PathEscape(PathBuf),

    #[error("git {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Failed to create symlink {link}: {source}")]
    Symlink {
        link: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GitError>;

static FORBIDDEN_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s\x00-\x1f\x7f~^:?*\[\]\\]|\.\.|@\{|^/|/$|//|/\.").expect("static ref-name pattern")
});

/// Check that `name` can be used as the last component of a branch name
///
/// Rejects whitespace and control characters, any of `~^:?*[]\`,
/// consecutive dots, a leading or trailing dot, and `@{`. A `/` may only
/// separate non-empty components that do not start with a dot, so the
/// item directory never leaves `.kiro/{specs,bugs}`. Empty names are
/// rejected as well.
pub fn is_valid_ref_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && !FORBIDDEN_REF_PATTERN.is_match(name)
}

/// Find the working-directory root of the repository containing `path`
pub fn discover_project_root(path: &Path) -> Result<PathBuf> {
    let repo = git2::Repository::discover(path)
        .map_err(|_| GitError::NotARepository(path.to_path_buf()))?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| GitError::NotARepository(path.to_path_buf()))?;

    // git2 reports workdirs with a trailing separator
    Ok(workdir.components().collect())
}

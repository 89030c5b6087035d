// Library modules for kiro-worktree
pub mod config;
pub mod conversion;
pub mod git;
pub mod metadata;
pub mod policy;
pub mod watch;

//! Execution of single git subcommands
//!
//! The runner is a pure side-effect wrapper: it spawns `git`, waits for it
//! and hands back what it printed. Deciding what a failure means is left to
//! the caller.

use super::{GitError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Captured output of a git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// The most useful error text: stderr when present, otherwise stdout
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Something that can run a git subcommand in a working directory
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` in `cwd` and capture its output
    ///
    /// A non-zero exit status is not an error at this level; only a failure
    /// to spawn git is.
    async fn output(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput>;

    /// Run `git <args>` and return stdout, turning a non-zero exit into
    /// [`GitError::CommandFailed`]
    async fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let output = self.output(cwd, args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(GitError::CommandFailed {
                command: args.join(" "),
                message: output.message(),
            })
        }
    }
}

/// Runs the `git` binary found on PATH
#[derive(Debug, Clone, Default)]
pub struct GitCli;

#[async_trait]
impl GitRunner for GitCli {
    async fn output(&self, cwd: &Path, args: &[&str]) -> Result<GitOutput> {
        tracing::debug!("git {} (in {})", args.join(" "), cwd.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await?;

        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

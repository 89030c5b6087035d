use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::git::worktree::{DEFAULT_MAIN_BRANCHES, DEFAULT_SHARED_DIRS};

/// Location of the project config, relative to the project root
pub const CONFIG_FILE: &str = ".kiro/worktree.toml";

/// Project-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Worktree behaviour
    pub worktree: WorktreeSettings,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Item watcher settings
    pub watch: WatchSettings,
}

/// Worktree configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorktreeSettings {
    /// Create a worktree before automatic execution of a bug workflow
    pub auto_bug_worktree: bool,
    /// Branches worktrees may be created from
    pub main_branches: Vec<String>,
    /// Main-tree directories linked into every worktree
    pub shared_dirs: Vec<String>,
}

impl Default for WorktreeSettings {
    fn default() -> Self {
        Self {
            auto_bug_worktree: false,
            main_branches: DEFAULT_MAIN_BRANCHES.iter().map(|s| s.to_string()).collect(),
            shared_dirs: DEFAULT_SHARED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Watcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Debounce duration in milliseconds
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl ProjectConfig {
    /// Path of the config file for a project
    pub fn path_for(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_FILE)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse worktree.toml")
    }

    /// Load the configuration of a project
    pub fn load(project_root: &Path) -> Result<Self> {
        Self::from_file(&Self::path_for(project_root))
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        write_config(path, &content)
    }

    /// Write the commented default config for a project
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn init(project_root: &Path, force: bool) -> Result<PathBuf> {
        let path = Self::path_for(project_root);
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
        write_config(&path, &Self::default_config_string())?;
        Ok(path)
    }

    /// Generate a default config file content
    pub fn default_config_string() -> String {
        r#"# kiro-worktree configuration

[worktree]
# Create a worktree automatically before unattended bug workflows
auto_bug_worktree = false
# Worktrees can only be created while one of these branches is checked out
main_branches = ["main", "master"]
# Main-tree directories linked into every worktree
shared_dirs = [".kiro/logs", ".kiro/runtime"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

[watch]
# Debounce for item change events, in milliseconds
debounce_ms = 500
"#
        .to_string()
    }
}

fn write_config(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))
}

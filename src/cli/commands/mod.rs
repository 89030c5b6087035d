pub mod config;
pub mod item;
pub mod list;
pub mod start;
pub mod watch;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiro_worktree::config::ProjectConfig;
use kiro_worktree::conversion::{ConversionOrchestrator, ItemProfile};
use kiro_worktree::git::paths::ItemKind;
use kiro_worktree::git::worktree::WorktreeRepository;
use kiro_worktree::metadata::JsonMetadataStore;

/// Everything a command needs to act on one project
pub struct Workspace {
    pub config: ProjectConfig,
    pub repo: Arc<WorktreeRepository>,
    pub store: Arc<JsonMetadataStore>,
}

impl Workspace {
    /// Open the project containing `project`, or the current directory
    pub fn open(project: Option<&Path>) -> Result<Self> {
        let start = start_dir(project)?;
        let repo = WorktreeRepository::open(&start)
            .with_context(|| format!("{} is not inside a git repository", start.display()))?;
        let config = ProjectConfig::load(repo.project_root())?;

        let repo = repo
            .with_main_branches(config.worktree.main_branches.clone())
            .with_shared_dirs(config.worktree.shared_dirs.clone());

        tracing::debug!("Project root: {}", repo.project_root().display());

        Ok(Self {
            config,
            repo: Arc::new(repo),
            store: Arc::new(JsonMetadataStore),
        })
    }

    pub fn root(&self) -> &Path {
        self.repo.project_root()
    }

    pub fn orchestrator(&self, kind: ItemKind) -> ConversionOrchestrator {
        ConversionOrchestrator::new(self.repo.clone(), self.store.clone(), ItemProfile::for_kind(kind))
    }
}

fn start_dir(project: Option<&Path>) -> Result<PathBuf> {
    match project {
        Some(path) => Ok(path.to_path_buf()),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Log level from the project config, when a project can be found
pub fn configured_log_level(project: Option<&Path>) -> Option<String> {
    let start = start_dir(project).ok()?;
    let root = kiro_worktree::git::discover_project_root(&start).ok()?;
    ProjectConfig::load(&root).ok().map(|config| config.logging.level)
}

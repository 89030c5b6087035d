//! Conversion of main-tree items into worktree-isolated items
//!
//! One state machine serves both item kinds; an [`ItemProfile`] carries
//! what differs between them (branch prefix and paths through the
//! [`ItemKind`], extra validation gates, what to copy, the `enabled` marker).
//!
//! Steps, each rolled back on a later failure:
//! 1. validate (no mutation)
//! 2. create branch + worktree
//! 3. migrate files (copy untracked items, verify committed ones)
//! 4. link shared directories
//! 5. write the worktree field into the worktree's metadata copy
//! 6. delete the main-tree source of an untracked item

pub mod error;
pub mod migrate;

pub use error::ConversionError;
pub use migrate::{MigrationScope, BUG_ARTIFACTS};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::git::paths::{item_dir, metadata_path, ItemKind};
use crate::git::runner::{GitCli, GitRunner};
use crate::git::status::{classify, CommitStatus};
use crate::git::worktree::{WorktreeDescriptor, WorktreeRepository};
use crate::git::is_valid_ref_name;
use crate::metadata::{self, JsonMetadataStore, MetadataError, MetadataStore, WorktreeField};

pub type Result<T> = std::result::Result<T, ConversionError>;

/// Extra validation applied to one kind of item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A branch without a worktree means implementation has started,
    /// which cannot be undone by converting
    ImplNotStarted,
}

/// Kind-specific conversion rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemProfile {
    pub kind: ItemKind,
    pub gates: &'static [Gate],
    pub scope: MigrationScope,
    /// Write `enabled: true` into the worktree field
    pub mark_enabled: bool,
}

impl ItemProfile {
    pub const SPEC: ItemProfile = ItemProfile {
        kind: ItemKind::Spec,
        gates: &[Gate::ImplNotStarted],
        scope: MigrationScope::WholeDirectory,
        mark_enabled: true,
    };

    pub const BUG: ItemProfile = ItemProfile {
        kind: ItemKind::Bug,
        gates: &[],
        scope: MigrationScope::Artifacts(&BUG_ARTIFACTS),
        mark_enabled: false,
    };

    pub fn for_kind(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Spec => Self::SPEC,
            ItemKind::Bug => Self::BUG,
        }
    }
}

/// Drives conversions for one kind of item
pub struct ConversionOrchestrator<R: GitRunner = GitCli, S: MetadataStore = JsonMetadataStore> {
    repo: Arc<WorktreeRepository<R>>,
    store: Arc<S>,
    profile: ItemProfile,
}

impl<R: GitRunner, S: MetadataStore> ConversionOrchestrator<R, S> {
    pub fn new(repo: Arc<WorktreeRepository<R>>, store: Arc<S>, profile: ItemProfile) -> Self {
        Self { repo, store, profile }
    }

    pub fn for_specs(repo: Arc<WorktreeRepository<R>>, store: Arc<S>) -> Self {
        Self::new(repo, store, ItemProfile::SPEC)
    }

    pub fn for_bugs(repo: Arc<WorktreeRepository<R>>, store: Arc<S>) -> Self {
        Self::new(repo, store, ItemProfile::BUG)
    }

    pub fn kind(&self) -> ItemKind {
        self.profile.kind
    }

    fn main_item_dir(&self, name: &str) -> PathBuf {
        item_dir(self.repo.project_root(), self.profile.kind, name)
    }

    /// Check whether `name` can be converted, without changing anything
    ///
    /// Returns the item's commit status, which is either `Untracked` or
    /// `CommittedClean` on success.
    pub async fn can_convert(&self, name: &str) -> Result<CommitStatus> {
        if !is_valid_ref_name(name) {
            return Err(ConversionError::InvalidName {
                name: name.to_string(),
            });
        }

        let current_branch = self.repo.current_branch().await?;
        if !self.repo.is_main_branch(&current_branch) {
            return Err(ConversionError::NotOnMainBranch { current_branch });
        }

        let metadata_file = metadata_path(self.repo.project_root(), self.profile.kind, name);
        let metadata = match self.store.read(&metadata_file).await {
            Ok(metadata) => metadata,
            Err(MetadataError::NotFound(path)) => {
                return Err(ConversionError::ItemNotFound { path });
            }
            Err(e) => {
                tracing::warn!("Unreadable metadata for {} {}: {}", self.profile.kind, name, e);
                return Err(ConversionError::ItemNotFound { path: metadata_file });
            }
        };

        if let Some(field) = &metadata.worktree {
            if let Some(path) = &field.path {
                return Err(ConversionError::AlreadyWorktreeMode { path: path.clone() });
            }
            if self.profile.gates.contains(&Gate::ImplNotStarted) {
                return Err(ConversionError::ImplAlreadyStarted {
                    branch: field.branch.clone(),
                });
            }
        }

        let item_path = self.main_item_dir(name);
        let changes = self.repo.check_uncommitted_changes(&item_path).await?;
        let status = classify(&changes.raw_status);

        if status == CommitStatus::CommittedDirty {
            let prefix = item_path
                .strip_prefix(self.repo.project_root())
                .unwrap_or(&item_path)
                .to_path_buf();
            let files = changes
                .files
                .iter()
                .map(|file| {
                    Path::new(file)
                        .strip_prefix(&prefix)
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_else(|_| file.clone())
                })
                .collect();
            return Err(ConversionError::HasUncommittedChanges { files });
        }

        Ok(status)
    }

    /// Move an item into its own worktree
    pub async fn convert(&self, name: &str) -> Result<WorktreeDescriptor> {
        let status = self.can_convert(name).await?;
        let kind = self.profile.kind;

        let descriptor = self
            .repo
            .create_worktree(kind, name)
            .await
            .map_err(ConversionError::from_create)?;

        let source = self.main_item_dir(name);
        let destination = item_dir(&descriptor.absolute_path, kind, name);

        let copied = if status == CommitStatus::Untracked {
            let scope = self.profile.scope;
            let (from, to) = (source.clone(), destination.clone());
            let result = tokio::task::spawn_blocking(move || migrate::copy_item(&from, &to, scope))
                .await
                .unwrap_or_else(|e| Err(std::io::Error::other(e)));

            match result {
                Ok(copied) => Some(copied),
                Err(e) => {
                    self.rollback(name, "file copy failed").await;
                    return Err(ConversionError::FileMoveFailed {
                        message: e.to_string(),
                    });
                }
            }
        } else {
            // A committed item arrives with the checkout itself
            let expected = metadata_path(&descriptor.absolute_path, kind, name);
            if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
                self.rollback(name, "item missing from checkout").await;
                return Err(ConversionError::ItemNotInWorktree { path: expected });
            }
            None
        };

        if let Err(e) = self
            .repo
            .create_auxiliary_symlinks(&descriptor.absolute_path, name)
            .await
        {
            self.rollback(name, "symlink creation failed").await;
            return Err(ConversionError::SymlinkCreateFailed {
                message: e.to_string(),
            });
        }

        let worktree_metadata = metadata_path(&descriptor.absolute_path, kind, name);
        if let Err(e) =
            persist_worktree_field(self.store.as_ref(), &worktree_metadata, &descriptor, self.profile.mark_enabled).await
        {
            self.rollback(name, "metadata update failed").await;
            return Err(e);
        }

        if let Some(copied) = copied {
            let scope = self.profile.scope;
            let from = source.clone();
            let removed = tokio::task::spawn_blocking(move || migrate::remove_source(&from, scope, &copied))
                .await
                .unwrap_or_else(|e| Err(std::io::Error::other(e)));

            if let Err(e) = removed {
                tracing::warn!(
                    "Converted {} {} but could not remove {}: {}",
                    kind,
                    name,
                    source.display(),
                    e
                );
            }
        }

        tracing::info!(
            "Converted {} {} to worktree {} ({})",
            kind,
            name,
            descriptor.relative_path,
            status
        );

        Ok(descriptor)
    }

    /// Remove an item's worktree and drop the worktree field from the
    /// main-tree metadata, if the item still has a copy there
    pub async fn detach(&self, name: &str) -> Result<()> {
        let kind = self.profile.kind;
        self.repo.remove_worktree(kind, name).await?;

        let main_metadata = metadata_path(self.repo.project_root(), kind, name);
        if tokio::fs::try_exists(&main_metadata).await.unwrap_or(false) {
            metadata::clear_worktree_field(self.store.as_ref(), &main_metadata)
                .await
                .map_err(|e| ConversionError::MetadataUpdateFailed {
                    path: main_metadata.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    async fn rollback(&self, name: &str, reason: &str) {
        tracing::warn!("Rolling back worktree for {} {}: {}", self.profile.kind, name, reason);
        if let Err(e) = self.repo.remove_worktree(self.profile.kind, name).await {
            tracing::warn!(
                "Rollback of worktree for {} {} failed, worktree may be orphaned: {}",
                self.profile.kind,
                name,
                e
            );
        }
    }
}

/// Write the worktree field for a freshly created worktree
///
/// Shared by manual conversion and automatic worktree creation so both
/// leave identical metadata behind.
pub(crate) async fn persist_worktree_field<S: MetadataStore + ?Sized>(
    store: &S,
    metadata_file: &Path,
    descriptor: &WorktreeDescriptor,
    mark_enabled: bool,
) -> Result<WorktreeField> {
    let field = WorktreeField::from_descriptor(descriptor, mark_enabled);
    metadata::set_worktree_field(store, metadata_file, &field)
        .await
        .map_err(|e| ConversionError::MetadataUpdateFailed {
            path: metadata_file.to_path_buf(),
            message: e.to_string(),
        })?;
    Ok(field)
}


#[cfg(test)]
mod tests {
    use super::testing::ReadOnlyStore;
    use super::*;
    use crate::git::worktree::testing::{commit_all, git, setup_repo};
    use crate::metadata::WorktreeMode;
    use serde_json::json;
    use std::fs;

    fn write_item(repo_path: &Path, kind: ItemKind, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = item_dir(repo_path, kind, name);
        fs::create_dir_all(&dir).unwrap();
        for (file, content) in files {
            fs::write(dir.join(file), content).unwrap();
        }
        dir
    }

    fn orchestrators(
        repo_path: &Path,
    ) -> (
        ConversionOrchestrator<GitCli, JsonMetadataStore>,
        ConversionOrchestrator<GitCli, JsonMetadataStore>,
    ) {
        let repo = Arc::new(WorktreeRepository::open(repo_path).unwrap());
        let store = Arc::new(JsonMetadataStore);
        (
            ConversionOrchestrator::for_specs(repo.clone(), store.clone()),
            ConversionOrchestrator::for_bugs(repo, store),
        )
    }

    #[tokio::test]
    async fn test_untracked_bug_conversion() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(
            &repo_path,
            ItemKind::Bug,
            "my-bug",
            &[("bug.json", r#"{"bug_name": "my-bug"}"#), ("report.md", "# Report")],
        );
        let (_, bugs) = orchestrators(&repo_path);

        let descriptor = bugs.convert("my-bug").await.unwrap();

        assert_eq!(descriptor.branch, "bugfix/my-bug");
        assert!(!source.exists());

        let moved = item_dir(&descriptor.absolute_path, ItemKind::Bug, "my-bug");
        assert_eq!(fs::read_to_string(moved.join("report.md")).unwrap(), "# Report");

        let metadata = JsonMetadataStore.read(&moved.join("bug.json")).await.unwrap();
        let field = metadata.worktree.unwrap();
        assert_eq!(field.branch, "bugfix/my-bug");
        assert_eq!(field.path.as_deref(), Some(descriptor.relative_path.as_str()));
        assert_eq!(field.created_at, descriptor.created_at);
        assert_eq!(field.enabled, None);
        assert_eq!(metadata.extra["bug_name"], json!("my-bug"));
    }

    #[tokio::test]
    async fn test_untracked_spec_round_trip() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(
            &repo_path,
            ItemKind::Spec,
            "my-feature",
            &[("spec.json", r#"{"feature_name": "my-feature"}"#), ("requirements.md", "reqs")],
        );
        fs::create_dir_all(source.join("research")).unwrap();
        fs::write(source.join("research/notes.md"), "notes").unwrap();
        let (specs, _) = orchestrators(&repo_path);

        let descriptor = specs.convert("my-feature").await.unwrap();

        assert!(!source.exists());
        let moved = item_dir(&descriptor.absolute_path, ItemKind::Spec, "my-feature");
        assert!(moved.join("research/notes.md").exists());

        let metadata = JsonMetadataStore.read(&moved.join("spec.json")).await.unwrap();
        assert_eq!(metadata.mode(), WorktreeMode::Isolated);
        let field = metadata.worktree.unwrap();
        assert_eq!(field, WorktreeField::from_descriptor(&descriptor, true));
        assert_eq!(field.enabled, Some(true));

        let link = descriptor.absolute_path.join(".kiro/logs");
        assert!(fs::symlink_metadata(link).unwrap().file_type().is_symlink());
    }

    #[tokio::test]
    async fn test_committed_clean_conversion_leaves_main_copy() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(
            &repo_path,
            ItemKind::Spec,
            "tracked",
            &[("spec.json", r#"{"feature_name": "tracked"}"#)],
        );
        commit_all(&repo_path, "add spec");
        let (specs, _) = orchestrators(&repo_path);

        assert_eq!(
            specs.can_convert("tracked").await.unwrap(),
            CommitStatus::CommittedClean
        );
        let descriptor = specs.convert("tracked").await.unwrap();

        // Main tree copy untouched, worktree copy updated
        let main_metadata = JsonMetadataStore.read(&source.join("spec.json")).await.unwrap();
        assert_eq!(main_metadata.mode(), WorktreeMode::Normal);

        let wt_metadata = JsonMetadataStore
            .read(&metadata_path(&descriptor.absolute_path, ItemKind::Spec, "tracked"))
            .await
            .unwrap();
        assert_eq!(wt_metadata.mode(), WorktreeMode::Isolated);
    }

    #[tokio::test]
    async fn test_committed_dirty_is_rejected() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(
            &repo_path,
            ItemKind::Spec,
            "my-feature",
            &[("spec.json", "{}"), ("requirements.md", "v1")],
        );
        commit_all(&repo_path, "add spec");
        fs::write(source.join("spec.json"), r#"{"phase": "design"}"#).unwrap();
        fs::write(source.join("requirements.md"), "v2").unwrap();
        let (specs, _) = orchestrators(&repo_path);

        let result = specs.convert("my-feature").await;
        match result {
            Err(ConversionError::HasUncommittedChanges { mut files }) => {
                files.sort();
                assert_eq!(files, vec!["requirements.md", "spec.json"]);
            }
            other => panic!("Expected HasUncommittedChanges, got {:?}", other),
        }

        let repo = WorktreeRepository::open(&repo_path).unwrap();
        assert!(!repo.worktree_exists(ItemKind::Spec, "my-feature").await);
        let branches = git(&repo_path, &["branch", "--list", "feature/my-feature"]);
        assert!(branches.trim().is_empty());
    }

    #[tokio::test]
    async fn test_dirty_files_with_non_ascii_names() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(
            &repo_path,
            ItemKind::Spec,
            "日本語",
            &[("spec.json", "{}"), ("要件.md", "v1")],
        );
        commit_all(&repo_path, "add spec");
        fs::write(source.join("spec.json"), r#"{"phase": "design"}"#).unwrap();
        fs::write(source.join("要件.md"), "v2").unwrap();
        let (specs, _) = orchestrators(&repo_path);

        match specs.can_convert("日本語").await {
            Err(ConversionError::HasUncommittedChanges { mut files }) => {
                files.sort();
                assert_eq!(files, vec!["spec.json", "要件.md"]);
            }
            other => panic!("Expected HasUncommittedChanges, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_on_main_branch() {
        let (_temp, repo_path) = setup_repo();
        write_item(&repo_path, ItemKind::Bug, "b", &[("bug.json", "{}")]);
        git(&repo_path, &["checkout", "-q", "-b", "feature/other"]);
        let (specs, bugs) = orchestrators(&repo_path);

        let expected = ConversionError::NotOnMainBranch {
            current_branch: "feature/other".to_string(),
        };
        assert_eq!(bugs.can_convert("b").await.unwrap_err(), expected);
        assert_eq!(bugs.convert("b").await.unwrap_err(), expected);
        assert_eq!(specs.convert("anything").await.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn test_item_not_found() {
        let (_temp, repo_path) = setup_repo();
        let (specs, _) = orchestrators(&repo_path);

        let result = specs.can_convert("ghost").await;
        assert!(matches!(result, Err(ConversionError::ItemNotFound { .. })));
    }

    #[tokio::test]
    async fn test_already_worktree_mode_is_stable() {
        let (_temp, repo_path) = setup_repo();
        write_item(
            &repo_path,
            ItemKind::Bug,
            "done",
            &[(
                "bug.json",
                r#"{"worktree": {"path": "../app-worktrees/bugs/done", "branch": "bugfix/done", "created_at": "2024-01-01T00:00:00.000Z"}}"#,
            )],
        );
        let (_, bugs) = orchestrators(&repo_path);
        let before = fs::read_to_string(metadata_path(&repo_path, ItemKind::Bug, "done")).unwrap();

        let first = bugs.can_convert("done").await.unwrap_err();
        let second = bugs.can_convert("done").await.unwrap_err();

        assert_eq!(first, second);
        assert!(matches!(first, ConversionError::AlreadyWorktreeMode { .. }));
        let after = fs::read_to_string(metadata_path(&repo_path, ItemKind::Bug, "done")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_impl_started_gate_is_spec_only() {
        let (_temp, repo_path) = setup_repo();
        let branch_only = r#"{"worktree": {"branch": "feature/x", "created_at": "2024-01-01T00:00:00.000Z"}}"#;
        write_item(&repo_path, ItemKind::Spec, "x", &[("spec.json", branch_only)]);
        write_item(&repo_path, ItemKind::Bug, "y", &[("bug.json", branch_only)]);
        let (specs, bugs) = orchestrators(&repo_path);

        assert_eq!(
            specs.can_convert("x").await.unwrap_err(),
            ConversionError::ImplAlreadyStarted {
                branch: "feature/x".to_string()
            }
        );
        assert_eq!(bugs.can_convert("y").await.unwrap(), CommitStatus::Untracked);
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let (_temp, repo_path) = setup_repo();
        let (specs, _) = orchestrators(&repo_path);

        for name in ["../escape", "/abs", "nested//item"] {
            let result = specs.can_convert(name).await;
            assert!(matches!(result, Err(ConversionError::InvalidName { .. })), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_existing_branch_aborts_before_migration() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(&repo_path, ItemKind::Bug, "dup", &[("bug.json", "{}")]);
        git(&repo_path, &["branch", "bugfix/dup"]);
        let (_, bugs) = orchestrators(&repo_path);

        let result = bugs.convert("dup").await;
        assert_eq!(
            result.unwrap_err(),
            ConversionError::BranchExists {
                branch: "bugfix/dup".to_string()
            }
        );
        assert!(source.join("bug.json").exists());
    }

    #[tokio::test]
    async fn test_missing_from_checkout_rolls_back() {
        let (_temp, repo_path) = setup_repo();
        fs::write(repo_path.join(".gitignore"), "spec.json\n").unwrap();
        commit_all(&repo_path, "ignore metadata");
        write_item(&repo_path, ItemKind::Spec, "hidden", &[("spec.json", "{}")]);
        let (specs, _) = orchestrators(&repo_path);

        let result = specs.convert("hidden").await;
        assert!(matches!(result, Err(ConversionError::ItemNotInWorktree { .. })));

        let repo = WorktreeRepository::open(&repo_path).unwrap();
        assert!(!repo.worktree_exists(ItemKind::Spec, "hidden").await);
        assert!(metadata_path(&repo_path, ItemKind::Spec, "hidden").exists());
    }

    #[tokio::test]
    async fn test_symlink_failure_rolls_back_and_keeps_source() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(
            &repo_path,
            ItemKind::Spec,
            "linked",
            &[("spec.json", "{}"), ("requirements.md", "reqs")],
        );
        // A regular file where the shared directory's parent should be
        fs::write(repo_path.join("blocker"), "not a directory").unwrap();
        let repo = Arc::new(
            WorktreeRepository::open(&repo_path)
                .unwrap()
                .with_shared_dirs(vec!["blocker/logs".to_string()]),
        );
        let specs = ConversionOrchestrator::for_specs(repo.clone(), Arc::new(JsonMetadataStore));

        let error = specs.convert("linked").await.unwrap_err();
        assert!(matches!(error, ConversionError::SymlinkCreateFailed { .. }));
        assert!(error.requires_rollback());

        assert!(!repo.worktree_exists(ItemKind::Spec, "linked").await);
        assert!(!repo.worktree_path(ItemKind::Spec, "linked").unwrap().absolute.exists());
        let branches = git(&repo_path, &["branch", "--list", "feature/linked"]);
        assert!(branches.trim().is_empty());
        assert_eq!(fs::read_to_string(source.join("requirements.md")).unwrap(), "reqs");
        assert!(source.join("spec.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_failure_rolls_back_and_keeps_source() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(&repo_path, ItemKind::Spec, "sock", &[("spec.json", "{}")]);
        // Sockets cannot be copied, whoever runs the test
        let _listener = std::os::unix::net::UnixListener::bind(source.join("agent.sock")).unwrap();
        let (specs, _) = orchestrators(&repo_path);

        let error = specs.convert("sock").await.unwrap_err();
        assert!(matches!(error, ConversionError::FileMoveFailed { .. }));
        assert!(error.requires_rollback());

        let repo = WorktreeRepository::open(&repo_path).unwrap();
        assert!(!repo.worktree_exists(ItemKind::Spec, "sock").await);
        assert!(!repo.worktree_path(ItemKind::Spec, "sock").unwrap().absolute.exists());
        let branches = git(&repo_path, &["branch", "--list", "feature/sock"]);
        assert!(branches.trim().is_empty());
        assert!(source.join("spec.json").exists());
        assert!(source.join("agent.sock").exists());
    }

    #[tokio::test]
    async fn test_metadata_failure_rolls_back_and_keeps_source() {
        let (_temp, repo_path) = setup_repo();
        let source = write_item(&repo_path, ItemKind::Bug, "stuck", &[("bug.json", "{}")]);
        let repo = Arc::new(WorktreeRepository::open(&repo_path).unwrap());
        let bugs = ConversionOrchestrator::for_bugs(repo.clone(), Arc::new(ReadOnlyStore));

        let result = bugs.convert("stuck").await;
        let error = result.unwrap_err();
        assert!(matches!(error, ConversionError::MetadataUpdateFailed { .. }));
        assert!(error.requires_rollback());

        assert!(!repo.worktree_exists(ItemKind::Bug, "stuck").await);
        assert!(source.join("bug.json").exists());
    }

    #[tokio::test]
    async fn test_detach_clears_main_metadata() {
        let (_temp, repo_path) = setup_repo();
        write_item(&repo_path, ItemKind::Spec, "tracked", &[("spec.json", "{}")]);
        commit_all(&repo_path, "add spec");
        let (specs, _) = orchestrators(&repo_path);
        let descriptor = specs.convert("tracked").await.unwrap();

        // Simulate the merged-back state where main also carries the field
        let main_metadata = metadata_path(&repo_path, ItemKind::Spec, "tracked");
        metadata::set_worktree_field(
            &JsonMetadataStore,
            &main_metadata,
            &WorktreeField::from_descriptor(&descriptor, true),
        )
        .await
        .unwrap();

        specs.detach("tracked").await.unwrap();

        assert!(!descriptor.absolute_path.exists());
        let metadata = JsonMetadataStore.read(&main_metadata).await.unwrap();
        assert_eq!(metadata.mode(), WorktreeMode::Normal);
    }
}

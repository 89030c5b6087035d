//! Automatic worktree creation for unattended workflow runs
//!
//! When the project opts in, starting an automatic run of a brand-new item
//! first puts it on its own branch and worktree. The worktree and metadata
//! end up exactly as a manual creation would leave them.

use std::path::Path;
use std::sync::Arc;

use crate::config::WorktreeSettings;
use crate::conversion::{persist_worktree_field, ConversionError, ItemProfile};
use crate::git::paths::ItemKind;
use crate::git::runner::{GitCli, GitRunner};
use crate::git::worktree::WorktreeRepository;
use crate::metadata::{JsonMetadataStore, MetadataStore, WorktreeField};

pub struct AutoWorktreePolicy<R: GitRunner = GitCli, S: MetadataStore = JsonMetadataStore> {
    enabled: bool,
    profile: ItemProfile,
    repo: Arc<WorktreeRepository<R>>,
    store: Arc<S>,
}

impl<R: GitRunner, S: MetadataStore> AutoWorktreePolicy<R, S> {
    /// Policy for bugs, driven by `worktree.auto_bug_worktree`
    pub fn for_bugs(settings: &WorktreeSettings, repo: Arc<WorktreeRepository<R>>, store: Arc<S>) -> Self {
        Self::new(settings.auto_bug_worktree, ItemKind::Bug, repo, store)
    }

    pub fn new(enabled: bool, kind: ItemKind, repo: Arc<WorktreeRepository<R>>, store: Arc<S>) -> Self {
        Self {
            enabled,
            profile: ItemProfile::for_kind(kind),
            repo,
            store,
        }
    }

    /// Whether automatic runs should start in a worktree
    pub fn decide(&self) -> bool {
        self.enabled
    }

    /// Create a worktree for `name` if the policy asks for one
    ///
    /// Returns `None` without touching anything when the policy is off.
    /// The worktree field is written to the metadata file in `item_path`;
    /// if that fails the new worktree is removed again.
    pub async fn start_with_auto_worktree(
        &self,
        name: &str,
        item_path: &Path,
    ) -> Result<Option<WorktreeField>, ConversionError> {
        if !self.decide() {
            return Ok(None);
        }

        let kind = self.profile.kind;
        let descriptor = self
            .repo
            .create_worktree(kind, name)
            .await
            .map_err(ConversionError::from_create)?;

        let metadata_file = item_path.join(kind.metadata_file());
        match persist_worktree_field(self.store.as_ref(), &metadata_file, &descriptor, self.profile.mark_enabled)
            .await
        {
            Ok(field) => {
                tracing::info!("Started {} {} in worktree {}", kind, name, descriptor.relative_path);
                Ok(Some(field))
            }
            Err(e) => {
                if let Err(rollback) = self.repo.remove_worktree(kind, name).await {
                    tracing::warn!("Failed to remove worktree for {} {}: {}", kind, name, rollback);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::testing::ReadOnlyStore;
    use crate::git::paths::item_dir;
    use crate::git::runner::testing::RecordingRunner;
    use crate::git::worktree::testing::setup_repo;
    use crate::metadata::WorktreeMode;
    use std::fs;

    #[tokio::test]
    async fn test_disabled_policy_does_nothing() {
        let repo = Arc::new(WorktreeRepository::with_runner("/work/app", RecordingRunner::default()));
        let policy = AutoWorktreePolicy::for_bugs(&WorktreeSettings::default(), repo.clone(), Arc::new(JsonMetadataStore));

        assert!(!policy.decide());
        let result = policy
            .start_with_auto_worktree("b", Path::new("/work/app/.kiro/bugs/b"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(repo.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_enabled_policy_creates_worktree() {
        let (_temp, repo_path) = setup_repo();
        let item = item_dir(&repo_path, ItemKind::Bug, "auto");
        fs::create_dir_all(&item).unwrap();
        fs::write(item.join("bug.json"), r#"{"bug_name": "auto"}"#).unwrap();

        let repo = Arc::new(WorktreeRepository::open(&repo_path).unwrap());
        let settings = WorktreeSettings {
            auto_bug_worktree: true,
            ..Default::default()
        };
        let policy = AutoWorktreePolicy::for_bugs(&settings, repo.clone(), Arc::new(JsonMetadataStore));

        let field = policy
            .start_with_auto_worktree("auto", &item)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(field.branch, "bugfix/auto");
        assert_eq!(field.path.as_deref(), Some("../app-worktrees/bugs/auto"));
        assert!(repo.worktree_exists(ItemKind::Bug, "auto").await);

        let metadata = JsonMetadataStore.read(&item.join("bug.json")).await.unwrap();
        assert_eq!(metadata.mode(), WorktreeMode::Isolated);
        assert_eq!(metadata.worktree, Some(field));
    }

    #[tokio::test]
    async fn test_metadata_failure_removes_worktree() {
        let (_temp, repo_path) = setup_repo();
        let item = item_dir(&repo_path, ItemKind::Bug, "auto");
        fs::create_dir_all(&item).unwrap();
        fs::write(item.join("bug.json"), "{}").unwrap();

        let repo = Arc::new(WorktreeRepository::open(&repo_path).unwrap());
        let policy = AutoWorktreePolicy::new(true, ItemKind::Bug, repo.clone(), Arc::new(ReadOnlyStore));

        let result = policy.start_with_auto_worktree("auto", &item).await;
        assert!(matches!(result, Err(ConversionError::MetadataUpdateFailed { .. })));
        assert!(!repo.worktree_exists(ItemKind::Bug, "auto").await);
    }
}

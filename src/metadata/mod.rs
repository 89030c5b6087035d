//! Item metadata files (`spec.json` / `bug.json`)
//!
//! The worktree engine only cares about the `worktree` field; everything
//! else in the file is carried through untouched. All writes go through
//! [`MetadataStore::merge`] so `updated_at` bookkeeping stays in one place.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::git::paths::resolve_path;
use crate::git::worktree::WorktreeDescriptor;

/// Metadata store errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Metadata file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;

/// The `worktree` field of an item's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeField {
    /// Worktree path relative to the project root; absent until isolated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub branch: String,
    pub created_at: String,
    /// Marker written by spec conversions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl WorktreeField {
    /// Field describing a freshly created worktree
    pub fn from_descriptor(descriptor: &WorktreeDescriptor, mark_enabled: bool) -> Self {
        Self {
            path: Some(descriptor.relative_path.clone()),
            branch: descriptor.branch.clone(),
            created_at: descriptor.created_at.clone(),
            enabled: mark_enabled.then_some(true),
        }
    }
}

/// Worktree mode derived from the metadata; never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeMode {
    /// No worktree field at all
    Normal,
    /// Work started on a named branch, still in the main tree
    BranchAssigned,
    /// Fully isolated in its own worktree
    Isolated,
}

/// Parsed item metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree: Option<WorktreeField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemMetadata {
    pub fn mode(&self) -> WorktreeMode {
        match &self.worktree {
            None => WorktreeMode::Normal,
            Some(field) if field.path.is_some() => WorktreeMode::Isolated,
            Some(_) => WorktreeMode::BranchAssigned,
        }
    }

    /// Directory an agent working on this item should run in
    ///
    /// The worktree when the item is isolated, the project root otherwise.
    /// A stored path that would escape the project's parent is ignored.
    pub fn working_dir(&self, project_root: &Path) -> PathBuf {
        self.worktree
            .as_ref()
            .and_then(|field| field.path.as_deref())
            .and_then(|path| match resolve_path(project_root, path) {
                Ok(resolved) => Some(resolved),
                Err(e) => {
                    tracing::warn!("Ignoring worktree path in metadata: {}", e);
                    None
                }
            })
            .unwrap_or_else(|| project_root.to_path_buf())
    }
}

/// Reader/writer for item metadata files
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Read and parse a metadata file
    async fn read(&self, path: &Path) -> Result<ItemMetadata>;

    /// Apply a partial update (JSON Merge Patch: `null` deletes a key)
    async fn merge(&self, path: &Path, update: Value) -> Result<()>;
}

/// Write the worktree field into a metadata file
pub async fn set_worktree_field<S: MetadataStore + ?Sized>(
    store: &S,
    path: &Path,
    field: &WorktreeField,
) -> Result<()> {
    let value = serde_json::to_value(field).map_err(|source| MetadataError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    store.merge(path, serde_json::json!({ "worktree": value })).await
}

/// Delete the worktree field from a metadata file
pub async fn clear_worktree_field<S: MetadataStore + ?Sized>(store: &S, path: &Path) -> Result<()> {
    store.merge(path, serde_json::json!({ "worktree": null })).await
}

/// Metadata store backed by pretty-printed JSON files
#[derive(Debug, Clone, Default)]
pub struct JsonMetadataStore;

impl JsonMetadataStore {
    async fn read_value(&self, path: &Path) -> Result<Value> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MetadataError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl MetadataStore for JsonMetadataStore {
    async fn read(&self, path: &Path) -> Result<ItemMetadata> {
        let value = self.read_value(path).await?;
        serde_json::from_value(value).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn merge(&self, path: &Path, update: Value) -> Result<()> {
        let mut document = self.read_value(path).await?;
        merge_patch(&mut document, update);

        if let Value::Object(ref mut map) = document {
            map.insert(
                "updated_at".to_string(),
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }

        let mut content = serde_json::to_string_pretty(&document).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        content.push('\n');

        tokio::fs::write(path, content)
            .await
            .map_err(|source| MetadataError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("Updated metadata {}", path.display());
        Ok(())
    }
}

/// RFC 7396 merge patch
fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_map) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(target_map) = target {
                for (key, value) in patch_map {
                    if value.is_null() {
                        target_map.remove(&key);
                    } else {
                        merge_patch(target_map.entry(key).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other,
    }
}

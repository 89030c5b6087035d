//! Worktree and item path computation
//!
//! Everything here is pure except [`locate_item`], which only checks for
//! existence. Worktrees live next to the project, never inside it:
//!
//! ```text
//! ../{project}-worktrees/{name}          spec worktrees
//! ../{project}-worktrees/bugs/{name}     bug worktrees
//! ```

use super::{GitError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Directory holding all work items inside a tree
pub const KIRO_DIR: &str = ".kiro";

/// Kind of work item a worktree belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Spec,
    Bug,
}

impl ItemKind {
    /// Branch namespace for this kind, without trailing slash
    pub fn branch_prefix(&self) -> &'static str {
        match self {
            ItemKind::Spec => "feature",
            ItemKind::Bug => "bugfix",
        }
    }

    /// Directory under `.kiro/` holding items of this kind
    pub fn items_dir(&self) -> &'static str {
        match self {
            ItemKind::Spec => "specs",
            ItemKind::Bug => "bugs",
        }
    }

    /// Name of the metadata file inside an item directory
    pub fn metadata_file(&self) -> &'static str {
        match self {
            ItemKind::Spec => "spec.json",
            ItemKind::Bug => "bug.json",
        }
    }

    /// Extra segment below `{project}-worktrees/`
    fn worktree_segment(&self) -> Option<&'static str> {
        match self {
            ItemKind::Spec => None,
            ItemKind::Bug => Some("bugs"),
        }
    }

    pub fn branch_name(&self, name: &str) -> String {
        format!("{}/{}", self.branch_prefix(), name)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Spec => write!(f, "spec"),
            ItemKind::Bug => write!(f, "bug"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spec" | "specs" | "feature" => Ok(ItemKind::Spec),
            "bug" | "bugs" | "bugfix" => Ok(ItemKind::Bug),
            _ => Err(format!("Unknown item kind: {} (expected spec or bug)", s)),
        }
    }
}

/// Location of a worktree, relative to and resolved against the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreePaths {
    pub relative: String,
    pub absolute: PathBuf,
}

/// Compute the worktree location for an item
pub fn worktree_path(project_root: &Path, kind: ItemKind, name: &str) -> Result<WorktreePaths> {
    let project = project_name(project_root);
    let relative = match kind.worktree_segment() {
        Some(segment) => format!("../{}-worktrees/{}/{}", project, segment, name),
        None => format!("../{}-worktrees/{}", project, name),
    };
    let absolute = resolve_path(project_root, &relative)?;
    Ok(WorktreePaths { relative, absolute })
}

fn project_name(project_root: &Path) -> String {
    project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

/// Resolve `relative` against the project root
///
/// The result is normalized lexically (the target usually does not exist
/// yet) and must stay under the parent directory of the project root.
pub fn resolve_path(project_root: &Path, relative: &str) -> Result<PathBuf> {
    let root = normalize(project_root);
    let resolved = normalize(&root.join(relative));
    let boundary = root.parent().unwrap_or(&root);

    if resolved.starts_with(boundary) && resolved != boundary {
        Ok(resolved)
    } else {
        Err(GitError::PathEscape(resolved))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, like the OS does
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Check that `relative` names a location inside a tree
///
/// Only plain components are accepted: no root, drive prefix or `..`,
/// and at least one named component so the tree root itself is refused.
pub fn tree_relative(relative: &str) -> Result<&Path> {
    let path = Path::new(relative);
    let plain = path.components().any(|c| matches!(c, Component::Normal(_)))
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if plain {
        Ok(path)
    } else {
        Err(GitError::PathEscape(path.to_path_buf()))
    }
}

/// Item directory relative to a tree root, e.g. `.kiro/bugs/my-bug`
pub fn item_relative_dir(kind: ItemKind, name: &str) -> PathBuf {
    Path::new(KIRO_DIR).join(kind.items_dir()).join(name)
}

/// Item directory inside the given tree (main project or a worktree)
pub fn item_dir(tree_root: &Path, kind: ItemKind, name: &str) -> PathBuf {
    tree_root.join(item_relative_dir(kind, name))
}

/// Metadata file of an item inside the given tree
pub fn metadata_path(tree_root: &Path, kind: ItemKind, name: &str) -> PathBuf {
    item_dir(tree_root, kind, name).join(kind.metadata_file())
}

/// Where an item currently lives
///
/// Prefers the worktree-mirrored directory when it exists, otherwise the
/// main-tree directory (whether or not that exists).
pub fn locate_item(project_root: &Path, kind: ItemKind, name: &str) -> PathBuf {
    if let Ok(worktree) = worktree_path(project_root, kind, name) {
        let mirrored = item_dir(&worktree.absolute, kind, name);
        if mirrored.exists() {
            return mirrored;
        }
    }
    item_dir(project_root, kind, name)
}

//! File migration from the main tree into a worktree
//!
//! Copy and removal are separate steps so the source is only deleted once
//! the worktree is completely set up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Files that make up a bug item
pub const BUG_ARTIFACTS: [&str; 6] = [
    "report.md",
    "analysis.md",
    "fix.md",
    "verification.md",
    "bug.json",
    "events.jsonl",
];

/// What gets moved when an untracked item is migrated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationScope {
    /// Everything below the item directory
    WholeDirectory,
    /// A fixed list of file names directly inside the item directory
    Artifacts(&'static [&'static str]),
}

/// Copy an item directory into `destination`, creating it as needed
///
/// Returns the paths of the copied top-level entries, relative to the
/// item directory.
pub fn copy_item(source: &Path, destination: &Path, scope: MigrationScope) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(destination)?;

    match scope {
        MigrationScope::WholeDirectory => {
            let mut copied = Vec::new();
            for entry in fs::read_dir(source)? {
                let entry = entry?;
                copy_entry(&entry.path(), &destination.join(entry.file_name()))?;
                copied.push(PathBuf::from(entry.file_name()));
            }
            Ok(copied)
        }
        MigrationScope::Artifacts(names) => {
            let mut copied = Vec::new();
            for name in names {
                let from = source.join(name);
                if from.is_file() {
                    fs::copy(&from, destination.join(name))?;
                    copied.push(PathBuf::from(name));
                }
            }
            Ok(copied)
        }
    }
}

fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    let file_type = fs::symlink_metadata(from)?.file_type();

    if file_type.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_entry(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else if file_type.is_symlink() {
        let target = fs::read_link(from)?;
        #[cfg(unix)]
        std::os::unix::fs::symlink(target, to)?;
        #[cfg(windows)]
        {
            if from.is_dir() {
                std::os::windows::fs::symlink_dir(target, to)?;
            } else {
                std::os::windows::fs::symlink_file(target, to)?;
            }
        }
    } else {
        fs::copy(from, to)?;
    }

    Ok(())
}

/// Delete the migrated source
///
/// A whole-directory item is removed recursively. For artifact items only
/// the copied files go; the directory itself is removed when nothing else
/// is left in it.
pub fn remove_source(source: &Path, scope: MigrationScope, copied: &[PathBuf]) -> io::Result<()> {
    match scope {
        MigrationScope::WholeDirectory => fs::remove_dir_all(source),
        MigrationScope::Artifacts(_) => {
            for name in copied {
                fs::remove_file(source.join(name))?;
            }
            if fs::read_dir(source)?.next().is_none() {
                fs::remove_dir(source)?;
            } else {
                tracing::warn!(
                    "Left {} in place: it still holds files outside the bug artifact set",
                    source.display()
                );
            }
            Ok(())
        }
    }
}

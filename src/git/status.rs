//! Classification of `git status --porcelain` output
//!
//! Only the two-character `XY` code at the start of each line matters here;
//! the path part is kept so callers can name the offending files.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commit state of a single work item, recomputed on every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitStatus {
    /// New files that git does not track yet (or only staged as added)
    Untracked,
    /// Tracked and identical to HEAD
    CommittedClean,
    /// Tracked with modifications, deletions or renames
    CommittedDirty,
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStatus::Untracked => write!(f, "untracked"),
            CommitStatus::CommittedClean => write!(f, "committed-clean"),
            CommitStatus::CommittedDirty => write!(f, "committed-dirty"),
        }
    }
}

/// One parsed porcelain line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub index: char,
    pub worktree: char,
    pub path: String,
}

impl StatusEntry {
    /// Parse `XY path`, `XY "quoted path"` or `XY old -> new`
    pub fn parse(line: &str) -> Option<Self> {
        let mut chars = line.chars();
        let index = chars.next()?;
        let worktree = chars.next()?;
        let rest = line.get(3..).unwrap_or("").trim();
        if rest.is_empty() {
            return None;
        }

        // Renames report "old -> new"; the new path is the live one
        let path = rest.rsplit(" -> ").next().unwrap_or(rest);

        Some(Self {
            index,
            worktree,
            path: unquote(path),
        })
    }

    fn is_untracked(&self) -> bool {
        (self.index == '?' && self.worktree == '?') || (self.index == 'A' && self.worktree == ' ')
    }

    fn is_dirty(&self) -> bool {
        [self.index, self.worktree]
            .iter()
            .any(|c| matches!(c, 'M' | 'D' | 'R'))
    }
}

/// Undo git's C-style path quoting (`"tab\there"`, `"\346\227\245"`)
fn unquote(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let raw = inner.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 == raw.len() {
            bytes.push(raw[i]);
            i += 1;
            continue;
        }

        let octal = raw
            .get(i + 1..i + 4)
            .filter(|digits| digits.iter().all(|d| (b'0'..=b'7').contains(d)));
        if let Some(digits) = octal {
            let value = digits.iter().fold(0u16, |acc, d| acc * 8 + u16::from(d - b'0'));
            bytes.push(value as u8);
            i += 4;
            continue;
        }

        bytes.push(match raw[i + 1] {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            other => other,
        });
        i += 2;
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parse every non-empty porcelain line
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    output.lines().filter_map(StatusEntry::parse).collect()
}

/// Classify a status listing scoped to one item
///
/// Dirty evidence wins over untracked evidence, which wins over the
/// clean default: an item with both new files and modified tracked files
/// must be resolved by the user before it can be migrated.
pub fn classify(output: &str) -> CommitStatus {
    let entries = parse_porcelain(output);

    if entries.iter().any(StatusEntry::is_dirty) {
        CommitStatus::CommittedDirty
    } else if entries.iter().any(StatusEntry::is_untracked) {
        CommitStatus::Untracked
    } else {
        CommitStatus::CommittedClean
    }
}

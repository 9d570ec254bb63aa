//! Tree-to-tree diffs between two versions.
//!
//! Paths are compared in lexicographic order so the diff text is
//! deterministic. Unmodified files are left out entirely. Content that is
//! not valid UTF-8 (or contains NUL bytes) is compared by hash only and
//! reported with a single `Binary files ... differ` line.

use crate::local::{content_hash, read_tree};
use genvault_core::{ChangesSummary, FileSet};
use genvault_error::GenvaultResult;
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

const CONTEXT_RADIUS: usize = 3;

/// How one path changed between two versions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Only in the newer version
    #[display("added")]
    Added,
    /// In both versions with different content
    #[display("modified")]
    Modified,
    /// Only in the older version
    #[display("removed")]
    Removed,
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Relative path, `/`-separated
    pub path: String,
    /// Kind of change
    pub kind: ChangeKind,
    /// Whether the line diff was skipped for this path
    pub binary: bool,
    /// Hash of the older content, if present
    pub old_sha256: Option<String>,
    /// Hash of the newer content, if present
    pub new_sha256: Option<String>,
}

/// Result of comparing two versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
    /// Concatenated unified diffs, one per changed text file
    pub diff_text: String,
    /// Counts of added/modified/removed files
    pub summary: ChangesSummary,
    /// Per-path changes in lexicographic order
    pub changes: Vec<FileChange>,
}

impl VersionDiff {
    /// True when the two versions hold identical files.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compare the `source/` trees of two stored versions.
///
/// # Errors
///
/// Returns `NotFound` if either version has no `source/` tree.
#[tracing::instrument(fields(from = %from_dir.display(), to = %to_dir.display()))]
pub async fn diff_versions(from_dir: &Path, to_dir: &Path) -> GenvaultResult<VersionDiff> {
    let from = read_tree(from_dir).await?;
    let to = read_tree(to_dir).await?;
    let diff = tokio::task::spawn_blocking(move || diff_file_sets(&from, &to))
        .await
        .map_err(|e| {
            genvault_error::StorageError::new(genvault_error::StorageErrorKind::FileRead(
                format!("task join error: {e}"),
            ))
        })?;

    tracing::debug!(
        added = diff.summary.added,
        modified = diff.summary.modified,
        removed = diff.summary.removed,
        "Computed version diff"
    );
    Ok(diff)
}

/// Compare two in-memory file sets.
///
/// # Examples
///
/// ```
/// use genvault_core::FileSet;
/// use genvault_storage::diff_file_sets;
///
/// let mut old = FileSet::new();
/// old.insert("a.py".into(), b"x=1\n".to_vec());
/// let mut new = FileSet::new();
/// new.insert("a.py".into(), b"x=2\n".to_vec());
/// new.insert("b.py".into(), b"new\n".to_vec());
///
/// let diff = diff_file_sets(&old, &new);
/// assert_eq!(diff.summary.counts(), (1, 1, 0));
/// assert!(diff.diff_text.contains("-x=1"));
/// assert!(diff.diff_text.contains("+x=2"));
/// ```
pub fn diff_file_sets(from: &FileSet, to: &FileSet) -> VersionDiff {
    let paths: BTreeSet<&String> = from.keys().chain(to.keys()).collect();
    let mut diff = VersionDiff::default();

    for path in paths {
        let old = from.get(path.as_str());
        let new = to.get(path.as_str());

        let kind = match (old, new) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Removed,
            (Some(a), Some(b)) if a != b => ChangeKind::Modified,
            _ => continue,
        };

        let old_text = old.map(|bytes| decode_text(bytes));
        let new_text = new.map(|bytes| decode_text(bytes));
        let binary = matches!(old_text, Some(None)) || matches!(new_text, Some(None));

        let (old_label, new_label) = match kind {
            ChangeKind::Added => ("/dev/null".to_string(), format!("b/{path}")),
            ChangeKind::Removed => (format!("a/{path}"), "/dev/null".to_string()),
            ChangeKind::Modified => (format!("a/{path}"), format!("b/{path}")),
        };

        if binary {
            let _ = writeln!(diff.diff_text, "Binary files {old_label} and {new_label} differ");
            diff.summary.binary += 1;
        } else {
            let old_str = old_text.flatten().unwrap_or("");
            let new_str = new_text.flatten().unwrap_or("");
            let text = TextDiff::from_lines(old_str, new_str)
                .unified_diff()
                .context_radius(CONTEXT_RADIUS)
                .header(&old_label, &new_label)
                .to_string();
            diff.diff_text.push_str(&text);
        }

        match kind {
            ChangeKind::Added => diff.summary.added += 1,
            ChangeKind::Modified => diff.summary.modified += 1,
            ChangeKind::Removed => diff.summary.removed += 1,
        }

        diff.changes.push(FileChange {
            path: path.clone(),
            kind,
            binary,
            old_sha256: old.map(|bytes| content_hash(bytes)),
            new_sha256: new.map(|bytes| content_hash(bytes)),
        });
    }

    diff
}

/// Text view of `bytes`, or `None` if it should not be line-diffed.
fn decode_text(bytes: &[u8]) -> Option<&str> {
    if bytes.contains(&0) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

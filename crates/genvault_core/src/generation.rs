//! Generation and project records.

use crate::{GenerationId, GenerationStatus, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counts of changed files between two successive versions.
///
/// Unmodified files are never counted. Files whose content could not be
/// decoded as text are still counted in `added`/`modified`/`removed` and
/// additionally tallied in `binary` (a content-hash-only change).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangesSummary {
    /// Files present only in the newer version
    pub added: u32,
    /// Files present in both versions with different content
    pub modified: u32,
    /// Files present only in the older version
    pub removed: u32,
    /// Changed files excluded from the line diff
    #[serde(default)]
    pub binary: u32,
    /// Set when the diff could not be computed; counts are then zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_error: Option<String>,
}

impl ChangesSummary {
    /// Summary recording that the diff was skipped because of `reason`.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            diff_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// The `(added, modified, removed)` triple.
    pub fn counts(&self) -> (u32, u32, u32) {
        (self.added, self.modified, self.removed)
    }

    /// Total number of changed files.
    pub fn total(&self) -> u32 {
        self.added + self.modified + self.removed
    }

    /// True when no file changed and the diff succeeded.
    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.diff_error.is_none()
    }
}

/// One persisted artifact set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Unique identifier
    pub id: GenerationId,
    /// Owning project
    pub project_id: ProjectId,
    /// Position in the project's history, starting at 1
    pub version: u32,
    /// Lifecycle status
    pub status: GenerationStatus,
    /// Whether this is the project's active generation
    pub is_active: bool,
    /// Local version directory once written
    pub storage_path: Option<String>,
    /// Number of files in the version
    pub file_count: u32,
    /// Sum of file sizes in bytes
    pub total_size_bytes: u64,
    /// Locator of the diff artifact against `version - 1`
    pub diff_from_previous: Option<String>,
    /// Change counts against `version - 1`
    pub changes_summary: Option<ChangesSummary>,
    /// Generation this one iterates on
    pub parent_generation_id: Option<GenerationId>,
    /// Prompt text that produced the files
    pub prompt: Option<String>,
    /// Failure reason when `status` is `failed`
    pub error_message: Option<String>,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the generation reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

impl Generation {
    /// A freshly reserved generation in `status`.
    pub fn reserved(
        id: GenerationId,
        project_id: ProjectId,
        version: u32,
        status: GenerationStatus,
    ) -> Self {
        Self {
            id,
            project_id,
            version,
            status,
            is_active: false,
            storage_path: None,
            file_count: 0,
            total_size_bytes: 0,
            diff_from_previous: None,
            changes_summary: None,
            parent_generation_id: None,
            prompt: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Address of this generation's content in either tier.
    pub fn key(&self) -> crate::GenerationKey {
        crate::GenerationKey::new(self.project_id, self.id, self.version)
    }
}

/// A project's version counter and active reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,
    /// Highest version ever assigned; never decreases
    pub latest_version: u32,
    /// The single active generation, if any
    pub active_generation_id: Option<GenerationId>,
    /// When the project was registered
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// A project with no versions assigned yet.
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            latest_version: 0,
            active_generation_id: None,
            created_at: Utc::now(),
        }
    }
}

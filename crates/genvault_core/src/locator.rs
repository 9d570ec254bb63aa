//! Addressing and result types shared by the storage tiers.

use crate::{GenerationId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Addresses one version's content in any tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenerationKey {
    /// Owning project
    pub project_id: ProjectId,
    /// Generation the content belongs to
    pub generation_id: GenerationId,
    /// Version number within the project
    pub version: u32,
}

impl GenerationKey {
    /// Create a key.
    pub fn new(project_id: ProjectId, generation_id: GenerationId, version: u32) -> Self {
        Self {
            project_id,
            generation_id,
            version,
        }
    }

    /// Version directory name: `v{version}__{generation_id}`.
    pub fn version_dir_name(&self) -> String {
        format!("v{}__{}", self.version, self.generation_id)
    }

    /// Remote object key: `{project_id}/{version}/{generation_id}.tar.gz`.
    pub fn object_key(&self) -> String {
        format!(
            "{}/{}/{}.tar.gz",
            self.project_id, self.version, self.generation_id
        )
    }
}

impl std::fmt::Display for GenerationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_id, self.version_dir_name())
    }
}

/// What a successful local save produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Version directory on local disk
    pub storage_path: PathBuf,
    /// Number of files written
    pub file_count: u32,
    /// Bytes written across all files
    pub total_size_bytes: u64,
}

/// Which tiers a deletion should touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeleteTargets {
    /// Delete the local version directory
    pub local: bool,
    /// Delete the remote archive
    pub cloud: bool,
}

impl DeleteTargets {
    /// Both tiers.
    pub fn both() -> Self {
        Self {
            local: true,
            cloud: true,
        }
    }

    /// Local tier only.
    pub fn local_only() -> Self {
        Self {
            local: true,
            cloud: false,
        }
    }

    /// Cloud tier only.
    pub fn cloud_only() -> Self {
        Self {
            local: false,
            cloud: true,
        }
    }
}

impl Default for DeleteTargets {
    fn default() -> Self {
        Self::both()
    }
}

/// Where a client can fetch a version's archive from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DownloadLocator {
    /// Time-limited URL issued by the cloud tier
    Signed {
        /// Direct download URL
        url: String,
        /// When the URL stops working
        expires_at: DateTime<Utc>,
    },
    /// Reference served by the local tier
    Local {
        /// Local path or application URL
        reference: String,
    },
}

impl DownloadLocator {
    /// The URL or reference string.
    pub fn as_str(&self) -> &str {
        match self {
            DownloadLocator::Signed { url, .. } => url,
            DownloadLocator::Local { reference } => reference,
        }
    }

    /// Whether the locator came from the cloud tier.
    pub fn is_signed(&self) -> bool {
        matches!(self, DownloadLocator::Signed { .. })
    }
}

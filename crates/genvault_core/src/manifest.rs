//! Per-version manifest.

use crate::{GenerationId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single file listed in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the version's `source/` root, `/`-separated
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 of the content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Authoritative, tier-independent description of one version.
///
/// # Examples
///
/// ```
/// use genvault_core::{GenerationId, Manifest, ManifestEntry, ProjectId};
///
/// let manifest = Manifest::new(
///     ProjectId::new(),
///     GenerationId::new(),
///     1,
///     vec![ManifestEntry { path: "a.py".into(), size: 3, sha256: None }],
/// );
/// assert_eq!(manifest.file_count, 1);
/// assert!(manifest.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Version number within the project
    pub version: u32,
    /// Generation the content belongs to
    pub generation_id: GenerationId,
    /// Owning project
    pub project_id: ProjectId,
    /// When the version was written
    pub created_at: DateTime<Utc>,
    /// Number of listed files
    pub file_count: u32,
    /// Files ordered by path
    pub files: Vec<ManifestEntry>,
    /// Prompt text that produced the files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Generation this one iterates on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_generation_id: Option<GenerationId>,
}

impl Manifest {
    /// Build a manifest, sorting `files` by path.
    pub fn new(
        project_id: ProjectId,
        generation_id: GenerationId,
        version: u32,
        mut files: Vec<ManifestEntry>,
    ) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            version,
            generation_id,
            project_id,
            created_at: Utc::now(),
            file_count: files.len() as u32,
            files,
            prompt: None,
            parent_generation_id: None,
        }
    }

    /// Attach the prompt annotation.
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Attach the iteration parent.
    pub fn with_parent(mut self, parent: Option<GenerationId>) -> Self {
        self.parent_generation_id = parent;
        self
    }

    /// Sum of all listed file sizes.
    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Structural check: version ≥ 1, `file_count` matches the list, paths
    /// are non-empty and unique.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.version == 0 {
            return Err("version must be at least 1".to_string());
        }
        if self.file_count as usize != self.files.len() {
            return Err(format!(
                "file_count {} does not match {} listed files",
                self.file_count,
                self.files.len()
            ));
        }
        let mut seen = HashSet::with_capacity(self.files.len());
        for entry in &self.files {
            if entry.path.is_empty() {
                return Err("empty file path".to_string());
            }
            if !seen.insert(entry.path.as_str()) {
                return Err(format!("duplicate file path: {}", entry.path));
            }
        }
        Ok(())
    }
}

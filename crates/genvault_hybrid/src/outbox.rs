//! Durable record of replications that have not reached the cloud tier.

use chrono::{DateTime, Utc};
use genvault_core::GenerationKey;
use genvault_error::{GenvaultResult, StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under the local root holding outbox entries.
pub const OUTBOX_DIR: &str = ".outbox";

/// One pending replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Version awaiting upload
    pub key: GenerationKey,
    /// Local version directory to upload
    pub version_dir: PathBuf,
    /// Upload attempts made so far
    pub attempts: usize,
    /// Most recent failure
    pub last_error: String,
    /// When the entry was last written
    pub recorded_at: DateTime<Utc>,
}

/// Outbox of pending replications, one JSON file per version.
#[derive(Debug, Clone)]
pub struct Outbox {
    dir: PathBuf,
}

impl Outbox {
    /// Outbox stored under `{local_root}/.outbox/`.
    pub fn new(local_root: &Path) -> Self {
        Self {
            dir: local_root.join(OUTBOX_DIR),
        }
    }

    /// Outbox directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &GenerationKey) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.json",
            key.project_id,
            key.version_dir_name()
        ))
    }

    /// Write or overwrite the entry for `entry.key`.
    #[tracing::instrument(skip(self, entry), fields(key = %entry.key, attempts = entry.attempts))]
    pub async fn record(&self, entry: &OutboxEntry) -> GenvaultResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| write_error(&self.dir, e))?;

        let json = serde_json::to_vec_pretty(entry).map_err(|e| {
            StorageError::new(StorageErrorKind::WriteFailure(format!(
                "serialize outbox entry: {e}"
            )))
        })?;
        let path = self.entry_path(&entry.key);
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| write_error(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| write_error(&path, e))?;

        tracing::info!(path = %path.display(), "Recorded pending replication");
        Ok(())
    }

    /// Remove the entry for `key`. Returns `true` if one existed.
    pub async fn remove(&self, key: &GenerationKey) -> GenvaultResult<bool> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(write_error(&path, e).into()),
        }
    }

    /// All pending entries, ordered by project and version.
    ///
    /// Unreadable entries are skipped with a warning.
    pub async fn pending(&self) -> GenvaultResult<Vec<OutboxEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(&self.dir, e).into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(|e| read_error(&self.dir, e))? {
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<OutboxEntry>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable outbox entry");
                }
            }
        }

        entries.sort_by_key(|entry| entry.key);
        Ok(entries)
    }
}

fn write_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::new(StorageErrorKind::WriteFailure(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

fn read_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::new(StorageErrorKind::FileRead(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

//! Manifest codec.
//!
//! Manifests are stored as pretty-printed JSON at the version-directory
//! root. Writes go through a temp file and a rename so a reader never sees
//! a half-written manifest.

use crate::layout::MANIFEST_FILE;
use genvault_core::Manifest;
use genvault_error::{GenvaultResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};

/// Serializes and parses per-version manifests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestCodec;

impl ManifestCodec {
    /// Path of the manifest inside `version_dir`.
    pub fn path(version_dir: &Path) -> PathBuf {
        version_dir.join(MANIFEST_FILE)
    }

    /// Encode a manifest to bytes.
    ///
    /// # Errors
    ///
    /// Returns `CorruptManifest` if the manifest fails its structural check;
    /// an invalid manifest is never written.
    pub fn encode(manifest: &Manifest) -> GenvaultResult<Vec<u8>> {
        manifest
            .validate()
            .map_err(|e| StorageError::new(StorageErrorKind::CorruptManifest(e)))?;
        serde_json::to_vec_pretty(manifest).map_err(|e| {
            StorageError::new(StorageErrorKind::CorruptManifest(e.to_string())).into()
        })
    }

    /// Decode and structurally check a manifest.
    ///
    /// # Errors
    ///
    /// Returns `CorruptManifest` if the bytes do not parse, required fields are
    /// missing, or `file_count` disagrees with the file list.
    pub fn decode(bytes: &[u8]) -> GenvaultResult<Manifest> {
        let manifest: Manifest = serde_json::from_slice(bytes)
            .map_err(|e| StorageError::new(StorageErrorKind::CorruptManifest(e.to_string())))?;
        manifest
            .validate()
            .map_err(|e| StorageError::new(StorageErrorKind::CorruptManifest(e)))?;
        Ok(manifest)
    }

    /// Write `manifest` alongside the version's content.
    #[tracing::instrument(skip(manifest), fields(dir = %version_dir.display(), version = manifest.version))]
    pub async fn write(version_dir: &Path, manifest: &Manifest) -> GenvaultResult<()> {
        let bytes = Self::encode(manifest)?;
        let path = Self::path(version_dir);
        let temp_path = path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            StorageError::new(StorageErrorKind::WriteFailure(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::WriteFailure(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(files = manifest.file_count, "Wrote manifest");
        Ok(())
    }

    /// Read the manifest stored in `version_dir`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no manifest and `CorruptManifest` if it
    /// cannot be parsed.
    #[tracing::instrument(fields(dir = %version_dir.display()))]
    pub async fn read(version_dir: &Path) -> GenvaultResult<Manifest> {
        let path = Self::path(version_dir);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;
        Self::decode(&bytes)
    }
}

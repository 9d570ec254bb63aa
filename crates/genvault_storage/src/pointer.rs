//! Per-project active pointer.
//!
//! The pointer is a relative symlink named `active` inside the project's
//! generations directory. Redirecting it builds a fresh link under a
//! temporary name and renames it over the old one, so readers observe either
//! the previous target or the new one and never a missing pointer.
//!
//! On platforms without symlinks the pointer is a small file holding the
//! target directory name, swapped the same way.

use crate::layout::{self, ACTIVE_POINTER};
use genvault_core::{GenerationId, GenerationKey, ProjectId};
use genvault_error::{GenvaultResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};

/// Manages the `active` reference of every project under a store root.
#[derive(Debug, Clone)]
pub struct ActivePointer {
    root: PathBuf,
}

impl ActivePointer {
    /// Create a pointer manager for the store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of the pointer for `project_id`.
    pub fn pointer_path(&self, project_id: ProjectId) -> PathBuf {
        layout::generations_dir(&self.root, project_id).join(ACTIVE_POINTER)
    }

    /// Redirect the project's pointer to the version directory of `key`.
    ///
    /// Returns the resolved version directory.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the target version directory does not exist
    /// - `PointerSwapFailed` if the swap cannot complete; the previous
    ///   pointer is left untouched
    #[tracing::instrument(skip(self, key), fields(key = %key))]
    pub async fn set_active(&self, key: &GenerationKey) -> GenvaultResult<PathBuf> {
        let generations = layout::generations_dir(&self.root, key.project_id);
        let target_name = key.version_dir_name();
        let target = generations.join(&target_name);

        if !tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(StorageError::new(StorageErrorKind::NotFound(format!(
                "version directory {}",
                target.display()
            )))
            .into());
        }

        let pointer = generations.join(ACTIVE_POINTER);
        let temp = generations.join(format!(".{}.tmp-{}", ACTIVE_POINTER, uuid::Uuid::new_v4()));

        if let Err(e) = create_link(&target_name, &temp).await {
            return Err(swap_failed(&pointer, "create temporary pointer", e));
        }

        if let Err(e) = tokio::fs::rename(&temp, &pointer).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                tracing::warn!(error = %cleanup, temp = %temp.display(), "Failed to remove temporary pointer");
            }
            return Err(swap_failed(&pointer, "rename", e));
        }

        tracing::info!(target = %target_name, "Active pointer updated");
        Ok(target)
    }

    /// Resolve the project's active version directory.
    ///
    /// Returns `None` when no pointer exists or it dangles.
    ///
    /// # Errors
    ///
    /// Returns `FileRead` if the pointer exists but cannot be read.
    pub async fn get_active(&self, project_id: ProjectId) -> GenvaultResult<Option<PathBuf>> {
        let generations = layout::generations_dir(&self.root, project_id);
        let Some(name) = read_link_target(&generations.join(ACTIVE_POINTER)).await? else {
            return Ok(None);
        };

        let resolved = generations.join(&name);
        let present = tokio::fs::metadata(&resolved)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !present {
            tracing::warn!(target = %name, "Active pointer is dangling");
            return Ok(None);
        }
        Ok(Some(resolved))
    }

    /// Version and generation the pointer names, if any.
    pub async fn active_version(
        &self,
        project_id: ProjectId,
    ) -> GenvaultResult<Option<(u32, GenerationId)>> {
        let resolved = self.get_active(project_id).await?;
        Ok(resolved
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .and_then(layout::parse_version_dir_name))
    }

    /// Remove the project's pointer. A missing pointer is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, project_id: ProjectId) -> GenvaultResult<()> {
        let pointer = self.pointer_path(project_id);
        match tokio::fs::remove_file(&pointer).await {
            Ok(()) => {
                tracing::debug!("Cleared active pointer");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(swap_failed(&pointer, "remove", e)),
        }
    }
}

fn swap_failed(
    pointer: &Path,
    step: &str,
    e: std::io::Error,
) -> genvault_error::GenvaultError {
    tracing::error!(pointer = %pointer.display(), step, error = %e, "Pointer swap failed");
    StorageError::new(StorageErrorKind::PointerSwapFailed(format!(
        "{} {}: {}",
        step,
        pointer.display(),
        e
    )))
    .into()
}

#[cfg(unix)]
async fn create_link(target_name: &str, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target_name, link).await
}

#[cfg(not(unix))]
async fn create_link(target_name: &str, link: &Path) -> std::io::Result<()> {
    tokio::fs::write(link, target_name.as_bytes()).await
}

#[cfg(unix)]
async fn read_link_target(pointer: &Path) -> GenvaultResult<Option<String>> {
    match tokio::fs::read_link(pointer).await {
        Ok(target) => Ok(target.to_str().map(str::to_string)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            pointer.display(),
            e
        )))
        .into()),
    }
}

#[cfg(not(unix))]
async fn read_link_target(pointer: &Path) -> GenvaultResult<Option<String>> {
    match tokio::fs::read_to_string(pointer).await {
        Ok(target) => Ok(Some(target.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            pointer.display(),
            e
        )))
        .into()),
    }
}

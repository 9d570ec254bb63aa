//! Directory-backed object store.
//!
//! Treats a local (typically network-mounted) directory as a bucket. Objects
//! are written through a temp file and a rename. Signed URLs are available
//! when a [`UrlSigner`] is attached.

use crate::{ObjectStore, UrlSigner};
use async_trait::async_trait;
use chrono::Utc;
use genvault_error::{CloudError, CloudErrorKind, GenvaultResult};
use genvault_storage::layout::sanitize_relative;
use std::path::PathBuf;
use std::time::Duration;

/// Object store rooted at a directory.
///
/// # Example Structure
///
/// ```text
/// /mnt/archive/
/// └── genvault/                 (prefix)
///     └── 6f1c.../
///         └── 3/
///             └── a3b9....tar.gz
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemObjectStore {
    root: PathBuf,
    signer: Option<UrlSigner>,
}

impl FileSystemObjectStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> GenvaultResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            CloudError::new(CloudErrorKind::InvalidConfig(format!(
                "bucket directory {}: {}",
                root.display(),
                e
            )))
        })?;
        tracing::info!(path = %root.display(), "Created filesystem object store");
        Ok(Self { root, signer: None })
    }

    /// Issue signed URLs through `signer`.
    pub fn with_signer(mut self, signer: UrlSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    fn object_path(&self, key: &str) -> GenvaultResult<PathBuf> {
        Ok(self.root.join(sanitize_relative(key)?))
    }
}

#[async_trait]
impl ObjectStore for FileSystemObjectStore {
    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> GenvaultResult<()> {
        let path = self.object_path(key)?;
        let upload_error =
            |e: std::io::Error| CloudError::new(CloudErrorKind::Upload(format!("{key}: {e}")));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_error)?;
        }
        let temp_path = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&temp_path, &data).await.map_err(upload_error)?;
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(upload_error(e).into());
        }

        tracing::debug!(path = %path.display(), "Stored object");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> GenvaultResult<Vec<u8>> {
        let path = self.object_path(key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CloudError::new(CloudErrorKind::NotFound(key.to_string())).into()
            } else {
                CloudError::new(CloudErrorKind::Download(format!("{key}: {e}"))).into()
            }
        })
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, key: &str) -> GenvaultResult<bool> {
        let path = self.object_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CloudError::new(CloudErrorKind::Delete(format!("{key}: {e}"))).into()),
        }
    }

    async fn exists(&self, key: &str) -> GenvaultResult<bool> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn presign(&self, key: &str, expires_in: Duration) -> GenvaultResult<Option<String>> {
        let Some(signer) = &self.signer else {
            return Ok(None);
        };
        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| CloudError::new(CloudErrorKind::Presign(e.to_string())))?;
        Ok(Some(signer.sign(key, Utc::now() + ttl)))
    }
}

//! Cloud tier adapter.
//!
//! Wraps an optional [`ObjectStore`]. A tier without a store is *disabled*:
//! every operation returns its "nothing happened" value (`None` or `false`)
//! without touching the network. Every remote call carries its own
//! deadline.

use crate::archive::{pack_version, unpack_version};
use crate::{CloudBackend, CloudConfig, FileSystemObjectStore, InMemoryObjectStore, ObjectStore, UrlSigner};
use chrono::{DateTime, Utc};
use genvault_core::GenerationKey;
use genvault_error::{CloudError, CloudErrorKind, GenvaultResult};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A signed download URL and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// Direct download URL
    pub url: String,
    /// When the URL stops working
    pub expires_at: DateTime<Utc>,
}

/// Remote replication and retrieval addressed by [`GenerationKey`].
#[derive(Debug, Clone)]
pub struct CloudTier {
    store: Option<Arc<dyn ObjectStore>>,
    prefix: Option<String>,
    operation_timeout: Duration,
}

impl CloudTier {
    /// Default deadline for one remote call.
    pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

    /// A tier that never talks to a backend.
    pub fn disabled() -> Self {
        Self {
            store: None,
            prefix: None,
            operation_timeout: Self::DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// A tier backed by `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store: Some(store),
            prefix: None,
            operation_timeout: Self::DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Prefix every object key with `prefix/`.
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        self
    }

    /// Override the per-call deadline.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Build the tier described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the selected backend lacks required
    /// settings or was not compiled in.
    #[tracing::instrument(skip(config), fields(enabled = config.enabled(), backend = %config.backend()))]
    pub async fn from_config(config: &CloudConfig) -> GenvaultResult<Self> {
        if !config.enabled() {
            tracing::info!("Cloud tier disabled");
            return Ok(Self::disabled());
        }

        let store: Arc<dyn ObjectStore> = match config.backend() {
            CloudBackend::Filesystem => {
                let root = config.root().as_ref().ok_or_else(|| {
                    CloudError::new(CloudErrorKind::InvalidConfig(
                        "cloud.root is required for the filesystem backend".to_string(),
                    ))
                })?;
                let mut store = FileSystemObjectStore::new(root)?;
                if let (Some(base), Some(secret)) = (config.public_base_url(), config.signing_secret()) {
                    store = store.with_signer(UrlSigner::new(base, secret)?);
                }
                Arc::new(store)
            }
            CloudBackend::Memory => Arc::new(InMemoryObjectStore::new()),
            CloudBackend::S3 => s3_store(config).await?,
        };

        Ok(Self::new(store)
            .with_prefix(config.prefix().clone())
            .with_operation_timeout(config.operation_timeout()))
    }

    /// Whether a backend is configured.
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Name of the configured backend, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.store.as_ref().map(|s| s.backend_name())
    }

    /// Remote key for `key`: `[{prefix}/]{project}/{version}/{generation}.tar.gz`.
    pub fn object_key(&self, key: &GenerationKey) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key.object_key()),
            None => key.object_key(),
        }
    }

    async fn with_deadline<T>(
        &self,
        operation: &str,
        future: impl Future<Output = GenvaultResult<T>>,
    ) -> GenvaultResult<T> {
        match tokio::time::timeout(self.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(CloudError::new(CloudErrorKind::Timeout(format!(
                "{} exceeded {:?}",
                operation, self.operation_timeout
            )))
            .into()),
        }
    }

    /// Compress `version_dir` and upload it.
    ///
    /// Returns the remote locator, or `None` when the tier is disabled.
    #[tracing::instrument(skip(self, version_dir), fields(key = %key, dir = %version_dir.display()))]
    pub async fn upload(
        &self,
        version_dir: &Path,
        key: &GenerationKey,
    ) -> GenvaultResult<Option<String>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let archive = pack_version(version_dir).await?;
        let size = archive.len();
        let object_key = self.object_key(key);
        self.with_deadline("upload", store.put(&object_key, archive))
            .await?;

        let locator = format!("{}://{}", store.backend_name(), object_key);
        tracing::info!(locator = %locator, bytes = size, "Uploaded version archive");
        Ok(Some(locator))
    }

    /// Download the archive for `key` and extract it into `destination`.
    ///
    /// Returns the extracted `source/` tree, or `None` when the tier is
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns a cloud `NotFound` error if no archive exists remotely.
    #[tracing::instrument(skip(self, destination), fields(key = %key, dest = %destination.display()))]
    pub async fn download(
        &self,
        key: &GenerationKey,
        destination: &Path,
    ) -> GenvaultResult<Option<PathBuf>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let object_key = self.object_key(key);
        let archive = self.with_deadline("download", store.get(&object_key)).await?;
        let source = unpack_version(archive, destination).await?;
        tracing::info!(source = %source.display(), "Downloaded version archive");
        Ok(Some(source))
    }

    /// Issue a time-limited URL for the archive of `key`.
    ///
    /// Returns `None` when the tier is disabled or the backend cannot sign.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn signed_url(
        &self,
        key: &GenerationKey,
        ttl: Duration,
    ) -> GenvaultResult<Option<SignedUrl>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let object_key = self.object_key(key);
        let url = self
            .with_deadline("presign", store.presign(&object_key, ttl))
            .await?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| CloudError::new(CloudErrorKind::Presign(e.to_string())))?;
        Ok(url.map(|url| SignedUrl { url, expires_at }))
    }

    /// Remove the archive of `key`.
    ///
    /// Returns `true` if an archive was removed; `false` when disabled or
    /// nothing was stored.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn delete(&self, key: &GenerationKey) -> GenvaultResult<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let object_key = self.object_key(key);
        let removed = self.with_deadline("delete", store.delete(&object_key)).await?;
        tracing::info!(removed, "Deleted remote archive");
        Ok(removed)
    }

    /// Whether an archive of `key` exists remotely.
    pub async fn exists(&self, key: &GenerationKey) -> GenvaultResult<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let object_key = self.object_key(key);
        self.with_deadline("exists", store.exists(&object_key)).await
    }
}

#[cfg(feature = "s3")]
async fn s3_store(config: &CloudConfig) -> GenvaultResult<Arc<dyn ObjectStore>> {
    let bucket = config.bucket().clone().ok_or_else(|| {
        CloudError::new(CloudErrorKind::InvalidConfig(
            "cloud.bucket is required for the s3 backend".to_string(),
        ))
    })?;
    let store = crate::S3ObjectStore::new(crate::S3Settings {
        bucket,
        endpoint: config.endpoint().clone(),
        region: config.region().clone(),
        access_key: config.access_key().clone(),
        secret_key: config.secret_key().clone(),
    })
    .await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
async fn s3_store(_config: &CloudConfig) -> GenvaultResult<Arc<dyn ObjectStore>> {
    Err(CloudError::new(CloudErrorKind::InvalidConfig(
        "the s3 backend requires the `s3` feature".to_string(),
    ))
    .into())
}

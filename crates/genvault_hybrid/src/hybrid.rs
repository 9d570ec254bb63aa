//! Hybrid storage coordinator.

use crate::outbox::{Outbox, OutboxEntry};
use crate::{DownloadConfig, ReplicationConfig};
use chrono::Utc;
use genvault_cache::{CacheManager, CacheSweeper};
use genvault_cloud::CloudTier;
use genvault_core::{DeleteTargets, DownloadLocator, FileSet, GenerationKey, SaveReceipt};
use genvault_error::{
    CloudErrorKind, GenvaultError, GenvaultErrorKind, GenvaultResult, StorageError,
    StorageErrorKind,
};
use genvault_storage::{LocalStore, VersionAnnotations};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};

/// Which tier served a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StorageTier {
    /// The local store
    #[display("local")]
    Local,
    /// The download cache, possibly filled from the cloud just now
    #[display("cache")]
    Cache,
}

/// A readable version directory and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Directory holding `manifest.json` and `source/`
    pub version_dir: PathBuf,
    /// Tier that served the read
    pub tier: StorageTier,
}

impl ResolvedVersion {
    /// The `source/` tree of the version.
    pub fn source_dir(&self) -> PathBuf {
        self.version_dir.join(genvault_storage::layout::SOURCE_DIR)
    }
}

/// Outcome of draining the replication outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Entries an upload was attempted for
    pub attempted: usize,
    /// Entries uploaded and removed from the outbox
    pub succeeded: usize,
    /// Entries that failed again and stay in the outbox
    pub failed: usize,
    /// Entries dropped because the local version no longer exists
    pub discarded: usize,
}

/// Composes the local store, cloud tier and cache.
///
/// Writes are local-first: [`save`](Self::save) returns once the bytes are
/// on local disk and replicates to the cloud tier in the background. Reads
/// try the local store, then the cache, then the cloud tier.
///
/// # Example
///
/// ```no_run
/// use genvault_cache::{CacheManager, CacheSweeper};
/// use genvault_cloud::CloudTier;
/// use genvault_core::{FileSet, GenerationId, GenerationKey, ProjectId};
/// use genvault_hybrid::HybridStorage;
/// use genvault_storage::{LocalStore, VersionAnnotations};
///
/// # async fn example() -> genvault_error::GenvaultResult<()> {
/// let storage = HybridStorage::new(
///     LocalStore::new("/var/genvault")?,
///     CloudTier::disabled(),
///     CacheManager::new("/var/cache/genvault")?,
/// );
///
/// let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
/// let mut files = FileSet::new();
/// files.insert("main.py".to_string(), b"print('hi')\n".to_vec());
///
/// let receipt = storage.save(&key, &files, &VersionAnnotations::default()).await?;
/// let resolved = storage.get(&key).await?;
/// assert_eq!(resolved.version_dir, receipt.storage_path);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HybridStorage {
    local: LocalStore,
    cloud: CloudTier,
    cache: CacheManager,
    outbox: Outbox,
    cache_ttl: Duration,
    signed_url_ttl: Duration,
    replication: ReplicationConfig,
    download: DownloadConfig,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
    sweeper: Option<Arc<CacheSweeper>>,
}

impl HybridStorage {
    /// Default maximum age of a cache entry served by [`get`](Self::get).
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86_400);

    /// Default lifetime of signed download URLs.
    pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

    /// Compose the three tiers with default policies.
    pub fn new(local: LocalStore, cloud: CloudTier, cache: CacheManager) -> Self {
        let outbox = Outbox::new(local.root());
        Self {
            local,
            cloud,
            cache,
            outbox,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            signed_url_ttl: Self::DEFAULT_SIGNED_URL_TTL,
            replication: ReplicationConfig::default(),
            download: DownloadConfig::default(),
            in_flight: Arc::new(Mutex::new(Vec::new())),
            sweeper: None,
        }
    }

    /// Maximum age of cache entries served by reads.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Lifetime of URLs issued by [`download_url`](Self::download_url)
    /// when no explicit TTL is given.
    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// Evict cache entries older than the cache TTL every `interval`.
    ///
    /// The sweeper stops once the last clone of this storage is dropped.
    /// Set the cache TTL first; the sweeper captures it when started.
    pub fn with_cache_sweeper(mut self, interval: Duration) -> Self {
        let sweeper = self.cache.start_sweeper(interval, self.cache_ttl);
        self.sweeper = Some(Arc::new(sweeper));
        self
    }

    /// Whether a background cache sweeper is running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|s| s.is_running())
    }

    /// Retry policy for background replication.
    pub fn with_replication(mut self, replication: ReplicationConfig) -> Self {
        self.replication = replication;
        self
    }

    /// How local download references are formed.
    pub fn with_download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    /// The local tier.
    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// The cloud tier.
    pub fn cloud(&self) -> &CloudTier {
        &self.cloud
    }

    /// The download cache.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// The replication outbox.
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Configured signed URL lifetime.
    pub fn signed_url_ttl(&self) -> Duration {
        self.signed_url_ttl
    }

    /// Write a version locally, then replicate it in the background.
    ///
    /// Success means the files are on local disk. Replication failures
    /// never reach the caller; exhausted retries leave an outbox entry.
    ///
    /// # Errors
    ///
    /// Returns the local store's error (`InvalidPath`, `WriteFailure`,
    /// `Timeout`) if the local write fails.
    #[tracing::instrument(skip(self, files, annotations), fields(key = %key, files = files.len()))]
    pub async fn save(
        &self,
        key: &GenerationKey,
        files: &FileSet,
        annotations: &VersionAnnotations,
    ) -> GenvaultResult<SaveReceipt> {
        let receipt = self.local.save(key, files, annotations).await?;

        if self.cloud.is_enabled() {
            let handle = tokio::spawn(replicate(
                self.cloud.clone(),
                self.outbox.clone(),
                self.replication.clone(),
                receipt.storage_path.clone(),
                *key,
            ));
            self.track(handle);
            tracing::debug!("Scheduled background replication");
        }

        Ok(receipt)
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.in_flight.lock() {
            Ok(mut handles) => {
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
            }
            Err(_) => {
                tracing::warn!("Replication tracker poisoned, task left detached");
            }
        }
    }

    /// Wait for every background replication started so far.
    pub async fn flush_replication(&self) {
        let handles = match self.in_flight.lock() {
            Ok(mut handles) => std::mem::take(&mut *handles),
            Err(_) => return,
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Replication task panicked");
            }
        }
    }

    /// Locate a readable copy of a version.
    ///
    /// Order: local store, fresh cache entry, cloud download into the
    /// cache. Cloud errors count as a miss.
    ///
    /// # Errors
    ///
    /// Returns storage `NotFound` if no tier has the version.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &GenerationKey) -> GenvaultResult<ResolvedVersion> {
        if self.local.exists(key).await {
            tracing::debug!("Served from local tier");
            return Ok(ResolvedVersion {
                version_dir: self.local.version_dir(key),
                tier: StorageTier::Local,
            });
        }

        if let Some(version_dir) = self.cache.lookup(key, self.cache_ttl).await {
            return Ok(ResolvedVersion {
                version_dir,
                tier: StorageTier::Cache,
            });
        }

        if let Some(version_dir) = self.fetch_into_cache(key).await {
            return Ok(ResolvedVersion {
                version_dir,
                tier: StorageTier::Cache,
            });
        }

        Err(StorageError::new(StorageErrorKind::NotFound(format!(
            "version {} in any tier",
            key
        )))
        .into())
    }

    async fn fetch_into_cache(&self, key: &GenerationKey) -> Option<PathBuf> {
        if !self.cloud.is_enabled() {
            return None;
        }

        // A stale entry would block the commit of the fresh download
        if let Err(e) = self.cache.invalidate(key).await {
            tracing::warn!(error = %e, "Failed to drop stale cache entry");
        }

        let staging = self.cache.staging_path_for(key);
        match self.cloud.download(key, &staging).await {
            Ok(Some(_)) => match self.cache.commit(key, &staging).await {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "Filled cache from cloud tier");
                    Some(path)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to commit cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!("Cloud tier has no archive");
                } else {
                    tracing::warn!(error = %e, "Cloud download failed, treating as miss");
                }
                remove_staging(&staging).await;
                None
            }
        }
    }

    /// A download locator for a version; never absent.
    ///
    /// Prefers a signed cloud URL once the archive is actually stored
    /// remotely. Falls back to a local reference when the cloud tier is
    /// disabled, has not received the archive yet, cannot sign, or fails.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn download_url(&self, key: &GenerationKey, ttl: Option<Duration>) -> DownloadLocator {
        if self.cloud.is_enabled()
            && self.archive_replicated(key).await
            && let Some(locator) = self.signed_locator(key, ttl).await
        {
            return locator;
        }
        self.local_locator(key)
    }

    async fn archive_replicated(&self, key: &GenerationKey) -> bool {
        match self.cloud.exists(key).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!("Archive not replicated yet, using local reference");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cloud existence check failed, using local reference");
                false
            }
        }
    }

    async fn signed_locator(&self, key: &GenerationKey, ttl: Option<Duration>) -> Option<DownloadLocator> {
        let ttl = ttl.unwrap_or(self.signed_url_ttl);
        match self.cloud.signed_url(key, ttl).await {
            Ok(Some(signed)) => Some(DownloadLocator::Signed {
                url: signed.url,
                expires_at: signed.expires_at,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Signed URL unavailable, using local reference");
                None
            }
        }
    }

    fn local_locator(&self, key: &GenerationKey) -> DownloadLocator {
        let reference = match self.download.local_base_url() {
            Some(base) => format!(
                "{}/{}/{}/{}",
                base.trim_end_matches('/'),
                key.project_id,
                key.version,
                key.generation_id
            ),
            None => self.local.version_dir(key).display().to_string(),
        };
        DownloadLocator::Local { reference }
    }

    /// Delete a version from the requested tiers.
    ///
    /// Each tier is attempted independently. Returns `true` if at least one
    /// requested deletion succeeded.
    #[tracing::instrument(skip(self), fields(key = %key, local = targets.local, cloud = targets.cloud))]
    pub async fn delete(&self, key: &GenerationKey, targets: DeleteTargets) -> bool {
        let mut any_succeeded = false;

        if targets.local {
            match self.local.delete(&self.local.version_dir(key)).await {
                Ok(()) => any_succeeded = true,
                Err(e) => tracing::warn!(error = %e, "Local delete failed"),
            }
            if let Err(e) = self.cache.invalidate(key).await {
                tracing::warn!(error = %e, "Cache invalidation failed");
            }
            if let Err(e) = self.outbox.remove(key).await {
                tracing::warn!(error = %e, "Outbox cleanup failed");
            }
        }

        if targets.cloud && self.cloud.is_enabled() {
            match self.cloud.delete(key).await {
                Ok(_) => any_succeeded = true,
                Err(e) => tracing::warn!(error = %e, "Cloud delete failed"),
            }
        }

        any_succeeded
    }

    /// Retry every pending replication once.
    ///
    /// Successful uploads are removed from the outbox; failures stay with
    /// an incremented attempt count.
    #[tracing::instrument(skip(self))]
    pub async fn replicate_pending(&self) -> GenvaultResult<ReplicationReport> {
        let mut report = ReplicationReport::default();
        if !self.cloud.is_enabled() {
            return Ok(report);
        }

        for mut entry in self.outbox.pending().await? {
            if !tokio::fs::try_exists(&entry.version_dir).await.unwrap_or(false) {
                tracing::warn!(key = %entry.key, "Local version gone, dropping outbox entry");
                self.outbox.remove(&entry.key).await?;
                report.discarded += 1;
                continue;
            }

            report.attempted += 1;
            match self.cloud.upload(&entry.version_dir, &entry.key).await {
                Ok(_) => {
                    self.outbox.remove(&entry.key).await?;
                    report.succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!(key = %entry.key, error = %e, "Replication retry failed");
                    entry.attempts += 1;
                    entry.last_error = e.to_string();
                    entry.recorded_at = Utc::now();
                    self.outbox.record(&entry).await?;
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            discarded = report.discarded,
            "Drained replication outbox"
        );
        Ok(report)
    }
}

fn is_permanent(error: &GenvaultError) -> bool {
    match error.kind() {
        GenvaultErrorKind::Cloud(e) => matches!(
            e.kind,
            CloudErrorKind::Archive(_) | CloudErrorKind::InvalidConfig(_)
        ),
        GenvaultErrorKind::Storage(_) => true,
        _ => false,
    }
}

async fn replicate(
    cloud: CloudTier,
    outbox: Outbox,
    policy: ReplicationConfig,
    version_dir: PathBuf,
    key: GenerationKey,
) {
    let strategy = ExponentialBackoff::from_millis(*policy.initial_backoff_ms())
        .factor(2)
        .max_delay(policy.max_backoff())
        .map(jitter)
        .take(policy.max_attempts().saturating_sub(1));

    let result = Retry::spawn(strategy, || {
        let cloud = cloud.clone();
        let version_dir = version_dir.clone();
        async move {
            match cloud.upload(&version_dir, &key).await {
                Ok(locator) => Ok(locator),
                Err(e) if is_permanent(&e) => Err(RetryError::Permanent(e)),
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "Upload failed, will retry");
                    Err(RetryError::Transient {
                        err: e,
                        retry_after: None,
                    })
                }
            }
        }
    })
    .await;

    match result {
        Ok(locator) => {
            tracing::info!(key = %key, locator = ?locator, "Replicated version");
        }
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Replication failed, recording in outbox");
            let entry = OutboxEntry {
                key,
                version_dir,
                attempts: *policy.max_attempts(),
                last_error: e.to_string(),
                recorded_at: Utc::now(),
            };
            if let Err(e) = outbox.record(&entry).await {
                tracing::error!(key = %key, error = %e, "Failed to record outbox entry");
            }
        }
    }
}

async fn remove_staging(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging directory");
    }
}

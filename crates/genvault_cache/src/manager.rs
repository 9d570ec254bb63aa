//! Cache of cloud-tier downloads.

use crate::CacheConfig;
use genvault_core::GenerationKey;
use genvault_error::{CacheError, CacheErrorKind, GenvaultResult};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;

/// Suffix marking an entry that is still being written.
pub const STAGING_SUFFIX: &str = ".partial";

/// Shortest period a sweeper runs at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Local on-disk cache of versions fetched from the cloud tier.
///
/// Entries mirror the local layout so a cached version directory can be
/// read exactly like a local one. An entry only becomes visible under
/// [`path_for`](Self::path_for) once it has been fully written to a
/// staging directory and renamed into place, so readers never observe a
/// partial download.
///
/// # Example Structure
///
/// ```text
/// /tmp/genvault-cache/
/// └── 6f1c.../
///     ├── v3__a3b9.../                      (committed entry)
///     │   ├── manifest.json
///     │   └── source/
///     └── v4__77d0....5e2a.partial/         (download in flight)
/// ```
#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
}

impl CacheManager {
    /// Create a cache rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> GenvaultResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| io_error(&root, e))?;
        tracing::info!(path = %root.display(), "Created cache manager");
        Ok(Self { root })
    }

    /// Create a cache from configuration.
    pub fn from_config(config: &CacheConfig) -> GenvaultResult<Self> {
        Self::new(config.root().clone())
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the entry for `key` lives. Does not imply the entry exists.
    pub fn path_for(&self, key: &GenerationKey) -> PathBuf {
        self.root
            .join(key.project_id.to_string())
            .join(key.version_dir_name())
    }

    /// A fresh staging directory path for downloading `key`.
    ///
    /// Each call returns a distinct path so concurrent downloads of the
    /// same version do not collide.
    pub fn staging_path_for(&self, key: &GenerationKey) -> PathBuf {
        self.root.join(key.project_id.to_string()).join(format!(
            "{}.{}{}",
            key.version_dir_name(),
            uuid::Uuid::new_v4().simple(),
            STAGING_SUFFIX
        ))
    }

    /// Move a fully written staging directory into place for `key`.
    ///
    /// If another writer committed the same entry first, the staging copy
    /// is discarded and the existing entry is kept.
    ///
    /// # Errors
    ///
    /// Returns `Commit` if the rename fails for any other reason.
    #[tracing::instrument(skip(self), fields(key = %key, staging = %staging.display()))]
    pub async fn commit(&self, key: &GenerationKey, staging: &Path) -> GenvaultResult<PathBuf> {
        let target = self.path_for(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        match tokio::fs::rename(staging, &target).await {
            Ok(()) => {
                tracing::debug!(path = %target.display(), "Committed cache entry");
                Ok(target)
            }
            Err(e) if is_dir(&target).await => {
                tracing::debug!(error = %e, "Cache entry already committed, discarding staging copy");
                discard(staging).await;
                Ok(target)
            }
            Err(e) => {
                discard(staging).await;
                Err(CacheError::new(CacheErrorKind::Commit(format!(
                    "{} -> {}: {}",
                    staging.display(),
                    target.display(),
                    e
                )))
                .into())
            }
        }
    }

    /// Whether `path` exists and was modified no longer than `ttl` ago.
    pub async fn is_fresh(&self, path: &Path, ttl: Duration) -> bool {
        match tokio::fs::metadata(path).await {
            Ok(meta) => match meta.modified() {
                Ok(modified) => age(modified) <= ttl,
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    /// Committed entry for `key` if it exists and is younger than `ttl`.
    pub async fn lookup(&self, key: &GenerationKey, ttl: Duration) -> Option<PathBuf> {
        let path = self.path_for(key);
        if self.is_fresh(&path, ttl).await {
            tracing::debug!(key = %key, "Cache hit");
            Some(path)
        } else {
            tracing::debug!(key = %key, "Cache miss");
            None
        }
    }

    /// Remove the entry for `key`. Missing entries are not an error.
    ///
    /// Returns `true` if an entry was removed.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn invalidate(&self, key: &GenerationKey) -> GenvaultResult<bool> {
        let path = self.path_for(key);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e).into()),
        }
    }

    /// Remove every committed entry older than `ttl`.
    ///
    /// Staging directories are never touched. Returns the number of entries
    /// removed.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn evict_older_than(&self, ttl: Duration) -> GenvaultResult<usize> {
        let mut removed = 0;
        let mut projects = match tokio::fs::read_dir(&self.root).await {
            Ok(projects) => projects,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(&self.root, e).into()),
        };

        while let Some(project) = projects
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, e))?
        {
            if !is_dir(&project.path()).await {
                continue;
            }
            let project_dir = project.path();
            let mut entries = tokio::fs::read_dir(&project_dir)
                .await
                .map_err(|e| io_error(&project_dir, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(&project_dir, e))?
            {
                let path = entry.path();
                if entry.file_name().to_string_lossy().ends_with(STAGING_SUFFIX) {
                    continue;
                }
                if self.is_fresh(&path, ttl).await {
                    continue;
                }
                match tokio::fs::remove_dir_all(&path).await {
                    Ok(()) => removed += 1,
                    // Lost a race with another sweeper or an invalidation
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to evict cache entry");
                    }
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Evicted stale cache entries");
        }
        Ok(removed)
    }

    /// Run [`evict_older_than`](Self::evict_older_than) every `interval`
    /// until the returned handle is aborted.
    ///
    /// A zero interval is raised to [`MIN_SWEEP_INTERVAL`].
    pub fn spawn_sweeper(&self, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        let interval = if interval.is_zero() {
            tracing::warn!(
                min = ?MIN_SWEEP_INTERVAL,
                "Zero cache sweep interval, using minimum"
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = cache.evict_older_than(ttl).await {
                    tracing::warn!(error = %e, "Cache sweep failed");
                }
            }
        })
    }

    /// Start a sweeper that stops when the returned guard is dropped.
    pub fn start_sweeper(&self, interval: Duration, ttl: Duration) -> CacheSweeper {
        tracing::info!(?interval, ?ttl, root = %self.root.display(), "Starting cache sweeper");
        CacheSweeper {
            handle: self.spawn_sweeper(interval, ttl),
        }
    }
}

/// Owns a background sweeper task and aborts it on drop.
#[derive(Debug)]
pub struct CacheSweeper {
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Whether the sweeper task is still running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn age(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to discard staging directory");
    }
}

fn io_error(path: &Path, e: std::io::Error) -> CacheError {
    CacheError::new(CacheErrorKind::Io(format!("{}: {}", path.display(), e)))
}

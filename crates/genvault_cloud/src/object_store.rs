//! Object storage backend trait.

use async_trait::async_trait;
use genvault_error::GenvaultResult;
use std::time::Duration;

/// Key/value object storage.
///
/// Backends address objects by `/`-separated keys. Implementations must be
/// safe to share across tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Short name of the backend, used in logs.
    fn backend_name(&self) -> &'static str;

    /// Store `data` under `key`, replacing any previous object.
    async fn put(&self, key: &str, data: Vec<u8>) -> GenvaultResult<()>;

    /// Fetch the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a cloud `NotFound` error when no object exists.
    async fn get(&self, key: &str) -> GenvaultResult<Vec<u8>>;

    /// Remove the object under `key`.
    ///
    /// Returns `true` if an object was removed. Removing a missing object is
    /// not an error.
    async fn delete(&self, key: &str) -> GenvaultResult<bool>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> GenvaultResult<bool>;

    /// Issue a time-limited download URL for `key`.
    ///
    /// Returns `None` if the backend cannot issue direct URLs.
    async fn presign(&self, key: &str, expires_in: Duration) -> GenvaultResult<Option<String>>;
}

//! In-memory object store for tests and local development.

use crate::ObjectStore;
use async_trait::async_trait;
use genvault_error::{CloudError, CloudErrorKind, GenvaultResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Object store held in process memory.
///
/// Counts every call so tests can assert that no remote traffic happened,
/// and can be switched into an outage mode where every call fails.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of trait calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Simulate an outage: while set, every call fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn record_call(&self, failure: impl FnOnce() -> CloudErrorKind) -> Result<(), CloudError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CloudError::new(failure()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> GenvaultResult<()> {
        self.record_call(|| CloudErrorKind::Upload(format!("{key}: backend unavailable")))?;
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> GenvaultResult<Vec<u8>> {
        self.record_call(|| CloudErrorKind::Download(format!("{key}: backend unavailable")))?;
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| CloudError::new(CloudErrorKind::NotFound(key.to_string())).into())
    }

    async fn delete(&self, key: &str) -> GenvaultResult<bool> {
        self.record_call(|| CloudErrorKind::Delete(format!("{key}: backend unavailable")))?;
        Ok(self.objects.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> GenvaultResult<bool> {
        self.record_call(|| CloudErrorKind::Download(format!("{key}: backend unavailable")))?;
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn presign(&self, key: &str, expires_in: Duration) -> GenvaultResult<Option<String>> {
        self.record_call(|| CloudErrorKind::Presign(format!("{key}: backend unavailable")))?;
        Ok(Some(format!(
            "memory://{}?expires_in={}",
            key,
            expires_in.as_secs()
        )))
    }
}

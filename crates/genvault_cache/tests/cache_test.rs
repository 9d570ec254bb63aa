//! Tests for the cache manager.

use genvault_cache::{CacheConfig, CacheConfigBuilder, CacheManager, STAGING_SUFFIX};
use genvault_core::{GenerationId, GenerationKey, ProjectId};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn key(version: u32) -> GenerationKey {
    GenerationKey::new(ProjectId::new(), GenerationId::new(), version)
}

async fn stage(cache: &CacheManager, key: &GenerationKey) -> std::path::PathBuf {
    let staging = cache.staging_path_for(key);
    tokio::fs::create_dir_all(staging.join("source")).await.unwrap();
    tokio::fs::write(staging.join("source").join("a.py"), b"x=1\n")
        .await
        .unwrap();
    staging
}

#[tokio::test]
async fn test_path_for_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(3);

    let path = cache.path_for(&key);
    assert_eq!(path, cache.path_for(&key));
    assert_eq!(
        path,
        temp_dir
            .path()
            .join(key.project_id.to_string())
            .join(format!("v3__{}", key.generation_id))
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn test_staging_paths_are_distinct() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(1);

    let a = cache.staging_path_for(&key);
    let b = cache.staging_path_for(&key);
    assert_ne!(a, b);
    assert!(a.to_string_lossy().ends_with(STAGING_SUFFIX));
}

#[tokio::test]
async fn test_commit_makes_entry_visible() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(1);
    let ttl = Duration::from_secs(3600);

    assert!(cache.lookup(&key, ttl).await.is_none());

    let staging = stage(&cache, &key).await;
    let committed = cache.commit(&key, &staging).await.unwrap();

    assert_eq!(committed, cache.path_for(&key));
    assert!(!staging.exists());
    assert!(committed.join("source").join("a.py").is_file());
    assert_eq!(cache.lookup(&key, ttl).await, Some(committed));
}

#[tokio::test]
async fn test_second_commit_keeps_first_entry() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(2);

    let first = stage(&cache, &key).await;
    let second = stage(&cache, &key).await;
    cache.commit(&key, &first).await.unwrap();
    let committed = cache.commit(&key, &second).await.unwrap();

    assert_eq!(committed, cache.path_for(&key));
    assert!(!second.exists());
}

#[tokio::test]
async fn test_is_fresh_respects_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(1);
    let staging = stage(&cache, &key).await;
    let path = cache.commit(&key, &staging).await.unwrap();

    assert!(cache.is_fresh(&path, Duration::from_secs(3600)).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!cache.is_fresh(&path, Duration::from_millis(10)).await);
    assert!(!cache.is_fresh(Path::new("/nonexistent/genvault"), Duration::MAX).await);
}

#[tokio::test]
async fn test_evict_removes_only_stale_committed_entries() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();

    let old = key(1);
    let staging = stage(&cache, &old).await;
    cache.commit(&old, &staging).await.unwrap();
    let in_flight = stage(&cache, &key(2)).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let removed = cache.evict_older_than(Duration::from_millis(10)).await.unwrap();

    assert_eq!(removed, 1);
    assert!(!cache.path_for(&old).exists());
    assert!(in_flight.exists());
}

#[tokio::test]
async fn test_evict_keeps_fresh_entries() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(1);
    let staging = stage(&cache, &key).await;
    cache.commit(&key, &staging).await.unwrap();

    let removed = cache.evict_older_than(Duration::from_secs(3600)).await.unwrap();

    assert_eq!(removed, 0);
    assert!(cache.path_for(&key).exists());
}

#[tokio::test]
async fn test_invalidate() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(1);
    let staging = stage(&cache, &key).await;
    cache.commit(&key, &staging).await.unwrap();

    assert!(cache.invalidate(&key).await.unwrap());
    assert!(!cache.invalidate(&key).await.unwrap());
}

#[tokio::test]
async fn test_sweeper_evicts_in_background() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let key = key(1);
    let staging = stage(&cache, &key).await;
    cache.commit(&key, &staging).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    let handle = cache.spawn_sweeper(Duration::from_millis(20), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.abort();

    assert!(!cache.path_for(&key).exists());
}

#[tokio::test]
async fn test_zero_sweep_interval_keeps_sweeper_running() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();
    let interval = CacheConfig::default()
        .with_sweep_interval_secs(0)
        .sweep_interval();

    let sweeper = cache.start_sweeper(interval, Duration::from_secs(3600));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(sweeper.is_running());
}

#[tokio::test]
async fn test_dropping_sweeper_stops_eviction() {
    let temp_dir = TempDir::new().unwrap();
    let cache = CacheManager::new(temp_dir.path()).unwrap();

    let sweeper = cache.start_sweeper(Duration::from_millis(20), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(sweeper);
    tokio::time::sleep(Duration::from_millis(30)).await;

    let key = key(1);
    let staging = stage(&cache, &key).await;
    cache.commit(&key, &staging).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(cache.path_for(&key).exists());
}

#[test]
fn test_config_builder_defaults() {
    let config = CacheConfigBuilder::default()
        .ttl_secs(60)
        .build()
        .unwrap();

    assert_eq!(config.ttl(), Duration::from_secs(60));
    assert_eq!(config.sweep_interval(), CacheConfig::default().sweep_interval());
    assert_eq!(config.root(), CacheConfig::default().root());

    let config = config.with_ttl_secs(5);
    assert_eq!(*config.ttl_secs(), 5);
}

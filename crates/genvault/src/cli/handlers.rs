//! Handlers for commands that work on the storage tiers directly.

use super::OutputFormat;
use genvault::{GenvaultConfig, ManifestCodec, ProjectId, diff_versions, open_storage};
use genvault_cache::CacheManager;
use genvault_storage::ActivePointer;
use std::path::Path;
use std::time::Duration;

/// Print the diff between two version directories.
pub async fn diff(from: &Path, to: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let diff = diff_versions(from, to).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
        OutputFormat::Human => {
            print!("{}", diff.diff_text);
            println!(
                "{} added, {} modified, {} removed ({} binary)",
                diff.summary.added, diff.summary.modified, diff.summary.removed, diff.summary.binary
            );
        }
    }
    Ok(())
}

/// Print a version's manifest as JSON.
pub async fn manifest(version_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = ManifestCodec::read(version_dir).await?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

/// Print the target of a project's active pointer.
pub async fn active(config: &GenvaultConfig, project_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let project_id: ProjectId = project_id.parse()?;
    let pointer = ActivePointer::new(config.storage().root().clone());
    match pointer.active_version(project_id).await? {
        Some((version, generation_id)) => {
            println!("v{version} ({generation_id})");
        }
        None => println!("No active version"),
    }
    Ok(())
}

/// Evict stale cache entries.
pub async fn evict(config: &GenvaultConfig, ttl_secs: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let cache = CacheManager::from_config(config.cache())?;
    let ttl = ttl_secs.map(Duration::from_secs).unwrap_or_else(|| config.cache().ttl());
    let removed = cache.evict_older_than(ttl).await?;
    println!("Evicted {removed} cache entries");
    Ok(())
}

/// Drain the replication outbox.
pub async fn replicate(config: &GenvaultConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(config).await?;
    if !storage.cloud().is_enabled() {
        println!("Cloud tier disabled; nothing to replicate");
        return Ok(());
    }
    let report = storage.replicate_pending().await?;
    println!(
        "Attempted {}, succeeded {}, failed {}, discarded {}",
        report.attempted, report.succeeded, report.failed, report.discarded
    );
    Ok(())
}

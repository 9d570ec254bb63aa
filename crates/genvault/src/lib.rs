//! Genvault - versioned storage for generated code
//!
//! Genvault persists every set of generated files as an immutable,
//! numbered version of its project, diffs each version against the one
//! before it, keeps one version per project *active*, and mirrors content
//! between a fast local disk tier and a durable object-storage tier.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use genvault::{GenerationService, GenvaultConfig};
//! use genvault_core::{FileSet, GenerationRequest, ProjectId};
//! use genvault_ledger::InMemoryVersionLedger;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> genvault_error::GenvaultResult<()> {
//!     let config = GenvaultConfig::load()?;
//!     genvault::init_logging(config.logging())?;
//!
//!     let ledger = Arc::new(InMemoryVersionLedger::new());
//!     let service = GenerationService::from_config(&config, ledger).await?;
//!
//!     let mut files = FileSet::new();
//!     files.insert("app/main.py".to_string(), b"print('hi')\n".to_vec());
//!     let request = GenerationRequest::builder()
//!         .project_id(ProjectId::new())
//!         .files(files)
//!         .activate(true)
//!         .build()
//!         .unwrap();
//!
//!     let saved = service.save(request).await?;
//!     println!("saved version {}", saved.generation.version);
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `database` - PostgreSQL version ledger
//! - `s3` - S3-compatible cloud backend
//! - `observability` - OpenTelemetry span export
//! - `all` - Enable all features
//!
//! # Architecture
//!
//! Genvault is organized as a workspace with focused crates:
//!
//! - `genvault_error` - Error types
//! - `genvault_core` - Identifiers, records, manifests
//! - `genvault_storage` - Local tier, manifests, diffs, active pointer
//! - `genvault_ledger` - Version ledger (in-memory and PostgreSQL)
//! - `genvault_cloud` - Cloud tier and object-store backends
//! - `genvault_cache` - Download cache
//! - `genvault_hybrid` - Local-first hybrid storage with replication
//!
//! This crate adds the orchestration service, configuration loading and
//! the `genvault` binary, and re-exports the rest for convenience.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod observability;
mod service;

pub use config::{DatabaseConfig, GenvaultConfig, StorageConfig};
pub use observability::{LoggingConfig, init_logging};
pub use service::{DeletedGeneration, GenerationService, SavedGeneration, open_storage};

pub use genvault_cache::{CacheConfig, CacheManager};
pub use genvault_cloud::{CloudBackend, CloudConfig, CloudTier, ObjectStore};
pub use genvault_core::*;
pub use genvault_error::*;
pub use genvault_hybrid::{
    DownloadConfig, HybridStorage, ReplicationConfig, ReplicationReport, ResolvedVersion,
    StorageTier,
};
pub use genvault_ledger::{Completion, GenerationDraft, InMemoryVersionLedger, VersionLedger};
#[cfg(feature = "database")]
pub use genvault_ledger::{PostgresVersionLedger, establish_connection, run_migrations};
pub use genvault_storage::{
    ActivePointer, ChangeKind, FileChange, LocalStore, ManifestCodec, VersionAnnotations,
    VersionDiff, diff_versions,
};

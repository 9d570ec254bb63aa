//! Hybrid storage for genvault.
//!
//! [`HybridStorage`] is the composition point of the storage tiers:
//!
//! - writes land on local disk synchronously and replicate to the cloud
//!   tier in the background, with bounded retries
//! - uploads that exhaust their retries are parked in an [`Outbox`] and
//!   drained by [`HybridStorage::replicate_pending`]
//! - reads try the local store, then the cache, then the cloud tier
//! - deletion touches each requested tier independently

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod hybrid;
mod outbox;

pub use config::{DownloadConfig, ReplicationConfig};
pub use hybrid::{HybridStorage, ReplicationReport, ResolvedVersion, StorageTier};
pub use outbox::{OUTBOX_DIR, Outbox, OutboxEntry};

//! Local cache for versions fetched from the cloud tier.
//!
//! [`CacheManager`] maps each version to a deterministic directory, commits
//! downloads atomically through staging directories, and evicts entries by
//! age, either on demand or from a background sweeper.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod manager;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use manager::{CacheManager, CacheSweeper, MIN_SWEEP_INTERVAL, STAGING_SUFFIX};

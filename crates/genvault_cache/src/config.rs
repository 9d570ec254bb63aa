//! Cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings of the `[cache]` configuration section.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct CacheConfig {
    /// Directory holding cached versions
    #[serde(default = "default_root")]
    #[builder(default = "default_root()")]
    root: PathBuf,

    /// Maximum age of a cached entry (seconds)
    #[serde(default = "default_ttl_secs")]
    #[builder(default = "default_ttl_secs()")]
    ttl_secs: u64,

    /// How often the background sweeper runs (seconds)
    #[serde(default = "default_sweep_interval_secs")]
    #[builder(default = "default_sweep_interval_secs()")]
    sweep_interval_secs: u64,
}

fn default_root() -> PathBuf {
    std::env::temp_dir().join("genvault-cache")
}

fn default_ttl_secs() -> u64 {
    86_400 // 1 day
}

fn default_sweep_interval_secs() -> u64 {
    900
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweeper period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

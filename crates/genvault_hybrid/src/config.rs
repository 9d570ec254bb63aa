//! Replication and download settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings of the `[replication]` configuration section.
///
/// Background uploads are retried with exponential backoff and jitter.
/// Once `max_attempts` is exhausted the upload is parked in the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ReplicationConfig {
    /// Upload attempts per save, including the first
    #[serde(default = "default_max_attempts")]
    max_attempts: usize,
    /// Base backoff between attempts (milliseconds)
    #[serde(default = "default_initial_backoff_ms")]
    initial_backoff_ms: u64,
    /// Upper bound on a single backoff delay (milliseconds)
    #[serde(default = "default_max_backoff_ms")]
    max_backoff_ms: u64,
}

fn default_max_attempts() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ReplicationConfig {
    /// Create a policy.
    pub fn new(max_attempts: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Longest delay between two attempts.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Settings of the `[download]` configuration section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct DownloadConfig {
    /// Base URL under which the application serves local versions.
    /// When unset, local references are filesystem paths.
    #[serde(default)]
    local_base_url: Option<String>,
}

impl DownloadConfig {
    /// Serve local versions under `base_url`.
    pub fn with_local_base_url(base_url: impl Into<String>) -> Self {
        Self {
            local_base_url: Some(base_url.into()),
        }
    }
}

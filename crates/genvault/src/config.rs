//! Layered configuration.
//!
//! Sources, in increasing precedence:
//! - Bundled defaults (include_str! from genvault.toml)
//! - `~/.config/genvault/genvault.toml`
//! - `./genvault.toml`
//! - An explicit file passed by the caller
//! - `GENVAULT__SECTION__KEY` environment variables

use crate::observability::LoggingConfig;
use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use genvault_cache::CacheConfig;
use genvault_cloud::CloudConfig;
use genvault_error::{ConfigError, GenvaultError, GenvaultResult};
use genvault_hybrid::{DownloadConfig, ReplicationConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../genvault.toml");

/// Settings of the `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct StorageConfig {
    /// Root directory of the local tier
    #[serde(default = "default_storage_root")]
    root: PathBuf,
    /// Deadline for writing one version (seconds)
    #[serde(default = "default_write_timeout_secs")]
    write_timeout_secs: u64,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./genvault-data")
}

fn default_write_timeout_secs() -> u64 {
    120
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            write_timeout_secs: default_write_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Local tier rooted at `root` with default timeouts.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Local write deadline.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

/// Settings of the `[database]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct DatabaseConfig {
    /// Connection URL; `None` falls back to `DATABASE_URL`
    #[serde(default)]
    url: Option<String>,
}

/// Complete genvault configuration.
///
/// # Example
///
/// ```no_run
/// use genvault::GenvaultConfig;
///
/// # fn main() -> genvault_error::GenvaultResult<()> {
/// let config = GenvaultConfig::load()?;
/// println!("local tier at {}", config.storage().root().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
pub struct GenvaultConfig {
    /// Local tier
    #[serde(default)]
    storage: StorageConfig,
    /// Download cache
    #[serde(default)]
    cache: CacheConfig,
    /// Cloud tier
    #[serde(default)]
    cloud: CloudConfig,
    /// Background replication policy
    #[serde(default)]
    replication: ReplicationConfig,
    /// Download locators
    #[serde(default)]
    download: DownloadConfig,
    /// Record store
    #[serde(default)]
    database: DatabaseConfig,
    /// Logging
    #[serde(default)]
    logging: LoggingConfig,
}

impl GenvaultConfig {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a source cannot be read or parsed.
    pub fn load() -> GenvaultResult<Self> {
        Self::load_with(None)
    }

    /// Load configuration, layering `explicit` over the standard locations.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a source cannot be read or parsed, or if
    /// `explicit` does not exist.
    #[instrument]
    pub fn load_with(explicit: Option<&Path>) -> GenvaultResult<Self> {
        debug!("Loading configuration with precedence: env > explicit > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/genvault/genvault.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("genvault").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("GENVAULT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .map_err(|e| {
                GenvaultError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                GenvaultError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// Load configuration from a single TOML string, without other sources.
    pub fn from_toml(toml: &str) -> GenvaultResult<Self> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                GenvaultError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                GenvaultError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })
    }

    /// The bundled defaults alone.
    pub fn bundled() -> GenvaultResult<Self> {
        Self::from_toml(DEFAULT_CONFIG)
    }

    /// Replace the storage section.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Replace the cache section.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the cloud section.
    pub fn with_cloud(mut self, cloud: CloudConfig) -> Self {
        self.cloud = cloud;
        self
    }

    /// Replace the replication section.
    pub fn with_replication(mut self, replication: ReplicationConfig) -> Self {
        self.replication = replication;
        self
    }

    /// Replace the download section.
    pub fn with_download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }
}

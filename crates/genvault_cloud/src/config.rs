//! Cloud tier settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which object-storage backend the cloud tier talks to.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum CloudBackend {
    /// Directory treated as a bucket
    #[default]
    #[display("filesystem")]
    Filesystem,
    /// Process memory (tests and demos)
    #[display("memory")]
    Memory,
    /// S3 or an S3-compatible service (feature `s3`)
    #[display("s3")]
    S3,
}

/// Settings of the `[cloud]` configuration section.
///
/// # Example
///
/// ```toml
/// [cloud]
/// enabled = true
/// backend = "s3"
/// bucket = "genvault-archive"
/// prefix = "prod"
/// endpoint = "http://localhost:9000"
/// region = "us-east-1"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct CloudConfig {
    /// Whether the cloud tier is used at all
    #[serde(default)]
    enabled: bool,
    /// Backend selection
    #[serde(default)]
    backend: CloudBackend,
    /// Bucket name (S3)
    #[serde(default)]
    bucket: Option<String>,
    /// Key prefix applied to every object
    #[serde(default)]
    prefix: Option<String>,
    /// Bucket directory (filesystem backend)
    #[serde(default)]
    root: Option<PathBuf>,
    /// Custom endpoint (S3-compatible services)
    #[serde(default)]
    endpoint: Option<String>,
    /// Region (S3)
    #[serde(default)]
    region: Option<String>,
    /// Static access key (S3)
    #[serde(default)]
    access_key: Option<String>,
    /// Static secret key (S3)
    #[serde(default)]
    secret_key: Option<String>,
    /// Secret used to sign filesystem-backend URLs
    #[serde(default)]
    signing_secret: Option<String>,
    /// Base URL under which filesystem-backend objects are served
    #[serde(default)]
    public_base_url: Option<String>,
    /// Deadline for each remote call
    #[serde(default = "default_operation_timeout_secs")]
    operation_timeout_secs: u64,
    /// Lifetime of issued signed URLs
    #[serde(default = "default_signed_url_ttl_secs")]
    signed_url_ttl_secs: u64,
}

fn default_operation_timeout_secs() -> u64 {
    30
}

fn default_signed_url_ttl_secs() -> u64 {
    3600
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CloudBackend::default(),
            bucket: None,
            prefix: None,
            root: None,
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
            signing_secret: None,
            public_base_url: None,
            operation_timeout_secs: default_operation_timeout_secs(),
            signed_url_ttl_secs: default_signed_url_ttl_secs(),
        }
    }
}

impl CloudConfig {
    /// Enabled configuration for `backend` with defaults elsewhere.
    pub fn enabled_with(backend: CloudBackend) -> Self {
        Self {
            enabled: true,
            backend,
            ..Self::default()
        }
    }

    /// Set the bucket directory of the filesystem backend.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the bucket name.
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Configure URL signing for the filesystem backend.
    pub fn with_signing(
        mut self,
        public_base_url: impl Into<String>,
        signing_secret: impl Into<String>,
    ) -> Self {
        self.public_base_url = Some(public_base_url.into());
        self.signing_secret = Some(signing_secret.into());
        self
    }

    /// Remote call deadline.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Signed URL lifetime.
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}

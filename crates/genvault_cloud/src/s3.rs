//! S3 object store.
//!
//! Works against AWS S3 and S3-compatible services (MinIO, R2). Custom
//! endpoints use path-style addressing.

use crate::ObjectStore;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::SharedCredentialsProvider;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client, Config};
use aws_types::region::Region;
use bytes::Bytes;
use genvault_error::{CloudError, CloudErrorKind, GenvaultResult};
use std::time::Duration;

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3ObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    /// Bucket name
    pub bucket: String,
    /// Custom endpoint; `None` targets AWS
    pub endpoint: Option<String>,
    /// Region; defaults to `us-east-1`
    pub region: Option<String>,
    /// Static access key; `None` reads `AWS_ACCESS_KEY_ID`
    pub access_key: Option<String>,
    /// Static secret key
    pub secret_key: Option<String>,
}

/// Object store backed by an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from `settings`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the bucket is empty or only one half of a
    /// static key pair is supplied.
    pub async fn new(settings: S3Settings) -> GenvaultResult<Self> {
        if settings.bucket.is_empty() {
            return Err(CloudError::new(CloudErrorKind::InvalidConfig(
                "S3 bucket cannot be empty".to_string(),
            ))
            .into());
        }

        let region = Region::new(
            settings
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        );

        let (access_key, secret_key) = match (&settings.access_key, &settings.secret_key) {
            (Some(access_key), Some(secret_key)) => (access_key.clone(), secret_key.clone()),
            (None, None) => match (
                std::env::var("AWS_ACCESS_KEY_ID"),
                std::env::var("AWS_SECRET_ACCESS_KEY"),
            ) {
                (Ok(access_key), Ok(secret_key)) => (access_key, secret_key),
                _ => {
                    return Err(CloudError::new(CloudErrorKind::InvalidConfig(
                        "no S3 credentials configured or in AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
                            .to_string(),
                    ))
                    .into());
                }
            },
            _ => {
                return Err(CloudError::new(CloudErrorKind::InvalidConfig(
                    "access_key and secret_key must be set together".to_string(),
                ))
                .into());
            }
        };

        let credentials = Credentials::new(access_key, secret_key, None, None, "static");
        let mut builder = Config::builder()
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .region(region)
            .behavior_version_latest();
        if let Some(endpoint) = &settings.endpoint {
            // Required for MinIO and other S3-compatible services
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let config = builder.build();

        tracing::info!(bucket = %settings.bucket, endpoint = ?settings.endpoint, "Created S3 object store");
        Ok(Self {
            client: Client::from_conf(config),
            bucket: settings.bucket,
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[tracing::instrument(skip(self, data), fields(bucket = %self.bucket, size = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> GenvaultResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(Bytes::from(data)))
            .send()
            .await
            .map_err(|e| CloudError::new(CloudErrorKind::Upload(format!("{key}: {e}"))))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> GenvaultResult<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    CloudError::new(CloudErrorKind::NotFound(key.to_string()))
                } else {
                    CloudError::new(CloudErrorKind::Download(format!("{key}: {e}")))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| CloudError::new(CloudErrorKind::Download(format!("{key}: {e}"))))?
            .into_bytes();
        Ok(data.to_vec())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, key: &str) -> GenvaultResult<bool> {
        let existed = self.exists(key).await?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| CloudError::new(CloudErrorKind::Delete(format!("{key}: {e}"))))?;
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> GenvaultResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if missing {
                    Ok(false)
                } else {
                    Err(CloudError::new(CloudErrorKind::Download(format!("head {key}: {e}"))).into())
                }
            }
        }
    }

    async fn presign(&self, key: &str, expires_in: Duration) -> GenvaultResult<Option<String>> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| CloudError::new(CloudErrorKind::Presign(e.to_string())))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| CloudError::new(CloudErrorKind::Presign(format!("{key}: {e}"))))?;
        Ok(Some(request.uri().to_string()))
    }
}

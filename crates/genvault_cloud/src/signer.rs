//! Keyed URL signatures for backends without native presigning.
//!
//! A signed URL has the form `{base}/{key}?expires={unix}&signature={hex}`
//! where the signature is HMAC-SHA256 keyed by the secret over the key and
//! expiry. The application serving `{base}` verifies it with
//! [`UrlSigner::verify`].

use chrono::{DateTime, Utc};
use genvault_error::{CloudError, CloudErrorKind};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks signed download URLs.
#[derive(Clone)]
pub struct UrlSigner {
    base_url: String,
    mac: HmacSha256,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl UrlSigner {
    /// Create a signer for URLs under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the secret cannot key the MAC.
    pub fn new(base_url: impl Into<String>, secret: impl AsRef<[u8]>) -> Result<Self, CloudError> {
        let mac = HmacSha256::new_from_slice(secret.as_ref()).map_err(|e| {
            CloudError::new(CloudErrorKind::InvalidConfig(format!(
                "cloud.signing_secret: {}",
                e
            )))
        })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mac,
        })
    }

    /// Signed URL for `key` valid until `expires_at`.
    pub fn sign(&self, key: &str, expires_at: DateTime<Utc>) -> String {
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.keyed(key, expires).finalize().into_bytes());
        format!(
            "{}/{}?expires={}&signature={}",
            self.base_url, key, expires, signature
        )
    }

    /// Check a signature presented at `now`. The comparison is constant-time.
    pub fn verify(&self, key: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() > expires {
            return false;
        }
        let Ok(presented) = hex::decode(signature) else {
            return false;
        };
        self.keyed(key, expires).verify_slice(&presented).is_ok()
    }

    fn keyed(&self, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }
}

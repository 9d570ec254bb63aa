//! Top-level error wrapper types.

use crate::{CacheError, CloudError, ConfigError, LedgerError, StorageError};
#[cfg(feature = "database")]
use crate::DatabaseError;

/// Every error area the engine can surface.
///
/// # Examples
///
/// ```
/// use genvault_error::{GenvaultError, StorageError, StorageErrorKind};
///
/// let storage_err = StorageError::new(StorageErrorKind::InvalidPath("../etc".into()));
/// let err: GenvaultError = storage_err.into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum GenvaultErrorKind {
    /// Local tier error
    #[from(StorageError)]
    Storage(StorageError),
    /// Version ledger error
    #[from(LedgerError)]
    Ledger(LedgerError),
    /// Cloud tier error
    #[from(CloudError)]
    Cloud(CloudError),
    /// Cache error
    #[from(CacheError)]
    Cache(CacheError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Database error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
}

/// Genvault error with kind discrimination.
///
/// # Examples
///
/// ```
/// use genvault_error::{GenvaultResult, ConfigError};
///
/// fn might_fail() -> GenvaultResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Genvault Error: {}", _0)]
pub struct GenvaultError(Box<GenvaultErrorKind>);

impl GenvaultError {
    /// Create a new error from a kind.
    pub fn new(kind: GenvaultErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &GenvaultErrorKind {
        &self.0
    }

    /// Whether the error reports missing content or records in any area.
    pub fn is_not_found(&self) -> bool {
        match self.kind() {
            GenvaultErrorKind::Storage(e) => e.is_not_found(),
            GenvaultErrorKind::Ledger(e) => e.is_not_found(),
            GenvaultErrorKind::Cloud(e) => {
                matches!(e.kind, crate::CloudErrorKind::NotFound(_))
            }
            #[cfg(feature = "database")]
            GenvaultErrorKind::Database(e) => {
                matches!(e.kind, crate::DatabaseErrorKind::NotFound)
            }
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to GenvaultErrorKind
impl<T> From<T> for GenvaultError
where
    T: Into<GenvaultErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for genvault operations.
pub type GenvaultResult<T> = std::result::Result<T, GenvaultError>;

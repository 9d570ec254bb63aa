//! Error types for the genvault generation storage engine.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Tier-disabled outcomes (an unconfigured cloud tier, a cache miss) are
//! modelled as `Option::None` by the callers and never appear here.
//!
//! # Examples
//!
//! ```
//! use genvault_error::{GenvaultErrorKind, GenvaultResult, LedgerError, LedgerErrorKind};
//!
//! fn delete_active() -> GenvaultResult<()> {
//!     Err(LedgerError::new(LedgerErrorKind::ActiveGenerationProtected("g1".into())))?
//! }
//!
//! let err = delete_active().unwrap_err();
//! assert!(matches!(err.kind(), GenvaultErrorKind::Ledger(_)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod cloud;
mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod ledger;
mod storage;

pub use cache::{CacheError, CacheErrorKind};
pub use cloud::{CloudError, CloudErrorKind};
pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{GenvaultError, GenvaultErrorKind, GenvaultResult};
pub use ledger::{LedgerError, LedgerErrorKind};
pub use storage::{StorageError, StorageErrorKind};

//! Remote tier of the genvault storage engine.
//!
//! Versions are replicated as compressed archives to an object store and
//! can be fetched back or shared through time-limited URLs. The tier is
//! optional: a [`CloudTier::disabled`] tier answers every request without
//! remote traffic.
//!
//! Backends implement [`ObjectStore`]:
//!
//! - [`FileSystemObjectStore`] treats a directory as a bucket
//! - [`InMemoryObjectStore`] keeps objects in memory (tests)
//! - `S3ObjectStore` (feature `s3`) talks to S3-compatible services

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod config;
mod filesystem;
mod memory;
mod object_store;
#[cfg(feature = "s3")]
mod s3;
mod signer;
mod tier;

pub use archive::{pack_version, unpack_version};
pub use config::{CloudBackend, CloudConfig};
pub use filesystem::FileSystemObjectStore;
pub use memory::InMemoryObjectStore;
pub use object_store::ObjectStore;
#[cfg(feature = "s3")]
pub use s3::{S3ObjectStore, S3Settings};
pub use signer::UrlSigner;
pub use tier::{CloudTier, SignedUrl};

//! Core data types for the genvault generation storage engine.
//!
//! A *generation* is one immutable set of generated files. Each generation
//! gets a project-scoped, monotonically increasing *version*, a manifest
//! describing its files, and an optional diff against the previous version.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod generation;
mod ids;
mod locator;
mod manifest;
mod request;
mod status;

pub use generation::{ChangesSummary, Generation, Project};
pub use ids::{GenerationId, ProjectId};
pub use locator::{DeleteTargets, DownloadLocator, GenerationKey, SaveReceipt};
pub use manifest::{Manifest, ManifestEntry};
pub use request::{FileSet, GenerationRequest, GenerationRequestBuilder};
pub use status::GenerationStatus;

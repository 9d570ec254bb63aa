//! Local tier of the genvault storage engine.
//!
//! This crate owns everything that touches the local disk:
//!
//! - [`LocalStore`] writes each generation once into its own version
//!   directory and reads it back
//! - [`ManifestCodec`] serializes the per-version manifest
//! - [`ActivePointer`] redirects a project's `active` reference atomically
//! - [`diff_versions`] and [`diff_file_sets`] compare two versions
//!
//! # Example
//!
//! ```no_run
//! use genvault_core::{FileSet, GenerationId, GenerationKey, ProjectId};
//! use genvault_storage::{LocalStore, VersionAnnotations};
//!
//! # async fn example() -> genvault_error::GenvaultResult<()> {
//! let store = LocalStore::new("/var/genvault")?;
//! let key = GenerationKey::new(ProjectId::new(), GenerationId::new(), 1);
//!
//! let mut files = FileSet::new();
//! files.insert("app/main.py".to_string(), b"print('hi')\n".to_vec());
//!
//! let receipt = store.save(&key, &files, &VersionAnnotations::default()).await?;
//! assert_eq!(receipt.file_count, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod diff;
pub mod layout;
mod local;
mod manifest;
mod pointer;

pub use diff::{ChangeKind, FileChange, VersionDiff, diff_file_sets, diff_versions};
pub use local::{LocalStore, VersionAnnotations, content_hash, read_tree};
pub use manifest::ManifestCodec;
pub use pointer::ActivePointer;

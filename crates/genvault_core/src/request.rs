//! Input to a generation save.

use crate::{GenerationId, ProjectId};
use std::collections::BTreeMap;

/// Generated files keyed by relative path, ordered for deterministic layout.
pub type FileSet = BTreeMap<String, Vec<u8>>;

/// One save request from the generation pipeline.
///
/// # Examples
///
/// ```
/// use genvault_core::{FileSet, GenerationRequest, ProjectId};
///
/// let mut files = FileSet::new();
/// files.insert("a.py".to_string(), b"x=1".to_vec());
///
/// let request = GenerationRequest::builder()
///     .project_id(ProjectId::new())
///     .files(files)
///     .prompt(Some("make a script".to_string()))
///     .activate(true)
///     .build()
///     .unwrap();
/// assert!(request.activate);
/// ```
#[derive(Debug, Clone, PartialEq, derive_builder::Builder)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Owning project
    pub project_id: ProjectId,
    /// Files to persist
    pub files: FileSet,
    /// Prompt text recorded in the manifest
    #[builder(default)]
    pub prompt: Option<String>,
    /// Generation being iterated on
    #[builder(default)]
    pub parent_generation_id: Option<GenerationId>,
    /// Activate the generation once completed
    #[builder(default)]
    pub activate: bool,
}

impl GenerationRequest {
    /// Creates a new request builder.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }
}

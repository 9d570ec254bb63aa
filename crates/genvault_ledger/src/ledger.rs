//! Version ledger trait and its request types.

use async_trait::async_trait;
use genvault_core::{ChangesSummary, Generation, GenerationId, Project, ProjectId};
use genvault_error::GenvaultResult;

/// A generation about to be reserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationDraft {
    /// Owning project
    pub project_id: ProjectId,
    /// Identifier the new generation will carry
    pub generation_id: GenerationId,
    /// Generation being iterated on
    pub parent_generation_id: Option<GenerationId>,
    /// Prompt text that produced the files
    pub prompt: Option<String>,
}

impl GenerationDraft {
    /// Draft with a fresh generation id and no lineage.
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            generation_id: GenerationId::new(),
            parent_generation_id: None,
            prompt: None,
        }
    }

    /// Set the prompt annotation.
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Set the parent generation.
    pub fn with_parent(mut self, parent: Option<GenerationId>) -> Self {
        self.parent_generation_id = parent;
        self
    }
}

/// Fields recorded when a generation completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Local version directory
    pub storage_path: String,
    /// Number of files written
    pub file_count: u32,
    /// Bytes written
    pub total_size_bytes: u64,
    /// Locator of the diff artifact, if one was produced
    pub diff_from_previous: Option<String>,
    /// Change counts against the previous version
    pub changes_summary: Option<ChangesSummary>,
}

/// Record store for projects and generations.
///
/// Implementations must serialize [`next_version`](VersionLedger::next_version)
/// per project so no two callers ever observe the same version number.
#[async_trait]
pub trait VersionLedger: Send + Sync {
    /// Register `project_id` if it is not yet known and return its record.
    async fn ensure_project(&self, project_id: ProjectId) -> GenvaultResult<Project>;

    /// Assign the next version of the draft's project.
    ///
    /// Reads `latest_version`, increments it, and inserts the generation row
    /// with status `processing` as one atomic step. Unknown projects are
    /// registered on first use.
    async fn next_version(&self, draft: GenerationDraft) -> GenvaultResult<Generation>;

    /// Attach storage details and mark the generation `completed`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the generation already reached a terminal status.
    async fn mark_completed(
        &self,
        generation_id: GenerationId,
        completion: Completion,
    ) -> GenvaultResult<Generation>;

    /// Mark the generation `failed` with a reason.
    async fn mark_failed(
        &self,
        generation_id: GenerationId,
        message: &str,
    ) -> GenvaultResult<Generation>;

    /// Make `generation_id` the project's single active generation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the generation does not exist or belongs elsewhere
    /// - `InvalidState` if the generation is not `completed`
    async fn activate(
        &self,
        project_id: ProjectId,
        generation_id: GenerationId,
    ) -> GenvaultResult<Generation>;

    /// Clear the project's active generation.
    ///
    /// Returns the generation that was active, if any.
    async fn deactivate(&self, project_id: ProjectId) -> GenvaultResult<Option<Generation>>;

    /// Remove a generation record and return it.
    ///
    /// # Errors
    ///
    /// - `ActiveGenerationProtected` if the generation is active
    /// - `SoleGenerationProtected` if it is the project's only generation
    async fn delete(&self, generation_id: GenerationId) -> GenvaultResult<Generation>;

    /// Look up one generation.
    async fn get_generation(&self, generation_id: GenerationId) -> GenvaultResult<Generation>;

    /// Look up one project.
    async fn get_project(&self, project_id: ProjectId) -> GenvaultResult<Project>;

    /// All generations of a project ordered by version.
    async fn list_generations(&self, project_id: ProjectId) -> GenvaultResult<Vec<Generation>>;

    /// The generation holding `version` in a project, if any.
    async fn generation_by_version(
        &self,
        project_id: ProjectId,
        version: u32,
    ) -> GenvaultResult<Option<Generation>>;
}

//! In-memory version ledger.
//!
//! Projects and generations live in maps behind one `RwLock`. Every mutation
//! takes the write lock, which serializes version assignment across all
//! projects. Data is lost when the ledger is dropped.

use crate::{Completion, GenerationDraft, VersionLedger};
use async_trait::async_trait;
use chrono::Utc;
use genvault_core::{Generation, GenerationId, GenerationStatus, Project, ProjectId};
use genvault_error::{GenvaultResult, LedgerError, LedgerErrorKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct LedgerState {
    projects: HashMap<ProjectId, Project>,
    generations: HashMap<GenerationId, Generation>,
}

impl LedgerState {
    fn generation_mut(&mut self, id: GenerationId) -> Result<&mut Generation, LedgerError> {
        self.generations
            .get_mut(&id)
            .ok_or_else(|| LedgerError::new(LedgerErrorKind::NotFound(format!("generation {id}"))))
    }
}

/// Ledger backed by process memory.
///
/// # Example
///
/// ```
/// use genvault_core::ProjectId;
/// use genvault_ledger::{GenerationDraft, InMemoryVersionLedger, VersionLedger};
///
/// # #[tokio::main]
/// # async fn main() -> genvault_error::GenvaultResult<()> {
/// let ledger = InMemoryVersionLedger::new();
/// let project = ProjectId::new();
/// let first = ledger.next_version(GenerationDraft::new(project)).await?;
/// let second = ledger.next_version(GenerationDraft::new(project)).await?;
/// assert_eq!((first.version, second.version), (1, 2));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryVersionLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryVersionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generation records held.
    pub async fn len(&self) -> usize {
        self.state.read().await.generations.len()
    }

    /// Whether the ledger holds no generations.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.generations.is_empty()
    }
}

#[async_trait]
impl VersionLedger for InMemoryVersionLedger {
    async fn ensure_project(&self, project_id: ProjectId) -> GenvaultResult<Project> {
        let mut state = self.state.write().await;
        let project = state
            .projects
            .entry(project_id)
            .or_insert_with(|| Project::new(project_id));
        Ok(project.clone())
    }

    #[tracing::instrument(skip(self, draft), fields(project_id = %draft.project_id))]
    async fn next_version(&self, draft: GenerationDraft) -> GenvaultResult<Generation> {
        let mut state = self.state.write().await;

        if state.generations.contains_key(&draft.generation_id) {
            return Err(LedgerError::new(LedgerErrorKind::VersionConflict(format!(
                "generation {} already reserved",
                draft.generation_id
            )))
            .into());
        }

        let project = state
            .projects
            .entry(draft.project_id)
            .or_insert_with(|| Project::new(draft.project_id));
        let version = project.latest_version + 1;
        project.latest_version = version;

        let mut generation = Generation::reserved(
            draft.generation_id,
            draft.project_id,
            version,
            GenerationStatus::Processing,
        );
        generation.prompt = draft.prompt;
        generation.parent_generation_id = draft.parent_generation_id;
        state.generations.insert(generation.id, generation.clone());

        tracing::info!(version, generation_id = %generation.id, "Reserved version");
        Ok(generation)
    }

    async fn mark_completed(
        &self,
        generation_id: GenerationId,
        completion: Completion,
    ) -> GenvaultResult<Generation> {
        let mut state = self.state.write().await;
        let generation = state.generation_mut(generation_id)?;
        if generation.status.is_terminal() {
            return Err(LedgerError::new(LedgerErrorKind::InvalidState(format!(
                "generation {} is already {}",
                generation_id, generation.status
            )))
            .into());
        }

        generation.status = GenerationStatus::Completed;
        generation.storage_path = Some(completion.storage_path);
        generation.file_count = completion.file_count;
        generation.total_size_bytes = completion.total_size_bytes;
        generation.diff_from_previous = completion.diff_from_previous;
        generation.changes_summary = completion.changes_summary;
        generation.error_message = None;
        generation.completed_at = Some(Utc::now());
        Ok(generation.clone())
    }

    async fn mark_failed(
        &self,
        generation_id: GenerationId,
        message: &str,
    ) -> GenvaultResult<Generation> {
        let mut state = self.state.write().await;
        let generation = state.generation_mut(generation_id)?;
        generation.status = GenerationStatus::Failed;
        generation.error_message = Some(message.to_string());
        generation.completed_at = Some(Utc::now());
        tracing::warn!(%generation_id, message, "Generation marked failed");
        Ok(generation.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn activate(
        &self,
        project_id: ProjectId,
        generation_id: GenerationId,
    ) -> GenvaultResult<Generation> {
        let mut state = self.state.write().await;

        let target = state
            .generations
            .get(&generation_id)
            .filter(|g| g.project_id == project_id)
            .ok_or_else(|| {
                LedgerError::new(LedgerErrorKind::NotFound(format!(
                    "generation {generation_id} in project {project_id}"
                )))
            })?;
        if target.status != GenerationStatus::Completed {
            return Err(LedgerError::new(LedgerErrorKind::InvalidState(format!(
                "generation {} is {}, not completed",
                generation_id, target.status
            )))
            .into());
        }

        let previous = state
            .projects
            .get(&project_id)
            .and_then(|p| p.active_generation_id);
        if let Some(previous) = previous.filter(|id| *id != generation_id)
            && let Some(old) = state.generations.get_mut(&previous)
        {
            old.is_active = false;
        }

        let generation = state.generation_mut(generation_id)?;
        generation.is_active = true;
        let activated = generation.clone();

        let project = state
            .projects
            .entry(project_id)
            .or_insert_with(|| Project::new(project_id));
        project.active_generation_id = Some(generation_id);

        tracing::info!(version = activated.version, "Activated generation");
        Ok(activated)
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate(&self, project_id: ProjectId) -> GenvaultResult<Option<Generation>> {
        let mut state = self.state.write().await;
        let Some(previous) = state
            .projects
            .get_mut(&project_id)
            .and_then(|p| p.active_generation_id.take())
        else {
            return Ok(None);
        };

        let generation = state.generation_mut(previous)?;
        generation.is_active = false;
        tracing::info!(version = generation.version, "Deactivated generation");
        Ok(Some(generation.clone()))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, generation_id: GenerationId) -> GenvaultResult<Generation> {
        let mut state = self.state.write().await;
        let generation = state
            .generations
            .get(&generation_id)
            .ok_or_else(|| {
                LedgerError::new(LedgerErrorKind::NotFound(format!("generation {generation_id}")))
            })?;

        if generation.is_active {
            return Err(LedgerError::new(LedgerErrorKind::ActiveGenerationProtected(
                generation_id.to_string(),
            ))
            .into());
        }
        let project_id = generation.project_id;
        let siblings = state
            .generations
            .values()
            .filter(|g| g.project_id == project_id)
            .count();
        if siblings <= 1 {
            return Err(LedgerError::new(LedgerErrorKind::SoleGenerationProtected(
                generation_id.to_string(),
            ))
            .into());
        }

        let removed = state.generations.remove(&generation_id).ok_or_else(|| {
            LedgerError::new(LedgerErrorKind::NotFound(format!("generation {generation_id}")))
        })?;
        tracing::info!(version = removed.version, "Deleted generation record");
        Ok(removed)
    }

    async fn get_generation(&self, generation_id: GenerationId) -> GenvaultResult<Generation> {
        let state = self.state.read().await;
        state.generations.get(&generation_id).cloned().ok_or_else(|| {
            LedgerError::new(LedgerErrorKind::NotFound(format!("generation {generation_id}")))
                .into()
        })
    }

    async fn get_project(&self, project_id: ProjectId) -> GenvaultResult<Project> {
        let state = self.state.read().await;
        state.projects.get(&project_id).cloned().ok_or_else(|| {
            LedgerError::new(LedgerErrorKind::NotFound(format!("project {project_id}"))).into()
        })
    }

    async fn list_generations(&self, project_id: ProjectId) -> GenvaultResult<Vec<Generation>> {
        let state = self.state.read().await;
        let mut generations: Vec<Generation> = state
            .generations
            .values()
            .filter(|g| g.project_id == project_id)
            .cloned()
            .collect();
        generations.sort_by_key(|g| g.version);
        Ok(generations)
    }

    async fn generation_by_version(
        &self,
        project_id: ProjectId,
        version: u32,
    ) -> GenvaultResult<Option<Generation>> {
        let state = self.state.read().await;
        Ok(state
            .generations
            .values()
            .find(|g| g.project_id == project_id && g.version == version)
            .cloned())
    }
}

//! Generation orchestration.
//!
//! [`GenerationService`] is the single entry point the application uses to
//! persist generated code. One save reserves a version in the ledger,
//! writes the files through the hybrid storage, records the diff against
//! the previous version, completes the record and optionally activates it.

use crate::GenvaultConfig;
use genvault_cache::CacheManager;
use genvault_cloud::CloudTier;
use genvault_core::{
    ChangesSummary, DeleteTargets, DownloadLocator, FileSet, Generation, GenerationId,
    GenerationRequest, GenerationStatus, Project, ProjectId, SaveReceipt,
};
use genvault_error::{GenvaultError, GenvaultResult, LedgerError, LedgerErrorKind};
use genvault_hybrid::HybridStorage;
use genvault_ledger::{Completion, GenerationDraft, VersionLedger};
use genvault_storage::{
    ActivePointer, LocalStore, VersionAnnotations, VersionDiff, diff_versions, read_tree,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Result of a save.
///
/// The save itself succeeded; activation is reported separately because a
/// failed pointer swap aborts activation without undoing the save.
#[derive(Debug, Clone)]
pub struct SavedGeneration {
    /// The completed generation record
    pub generation: Generation,
    /// Why the requested activation did not happen
    pub activation_error: Option<String>,
}

impl SavedGeneration {
    /// Whether the generation ended up active.
    pub fn is_active(&self) -> bool {
        self.generation.is_active
    }
}

/// Outcome of deleting a generation.
#[derive(Debug, Clone)]
pub struct DeletedGeneration {
    /// The removed record
    pub generation: Generation,
    /// Whether any storage tier removed content
    pub content_removed: bool,
}

/// Orchestrates ledger, hybrid storage, diffing and the active pointer.
///
/// # Example
///
/// ```no_run
/// use genvault::{GenerationService, GenvaultConfig};
/// use genvault_core::{FileSet, GenerationRequest, ProjectId};
/// use genvault_ledger::InMemoryVersionLedger;
/// use std::sync::Arc;
///
/// # async fn example() -> genvault_error::GenvaultResult<()> {
/// let config = GenvaultConfig::load()?;
/// let service =
///     GenerationService::from_config(&config, Arc::new(InMemoryVersionLedger::new())).await?;
///
/// let mut files = FileSet::new();
/// files.insert("a.py".to_string(), b"x=1".to_vec());
/// let request = GenerationRequest::builder()
///     .project_id(ProjectId::new())
///     .files(files)
///     .activate(true)
///     .build()
///     .unwrap();
///
/// let saved = service.save(request).await?;
/// assert_eq!(saved.generation.version, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GenerationService {
    ledger: Arc<dyn VersionLedger>,
    storage: HybridStorage,
    pointer: ActivePointer,
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("storage", &self.storage)
            .field("pointer", &self.pointer)
            .finish_non_exhaustive()
    }
}

impl GenerationService {
    /// Compose a service from a ledger and hybrid storage.
    ///
    /// Active pointers live under the local tier's root.
    pub fn new(ledger: Arc<dyn VersionLedger>, storage: HybridStorage) -> Self {
        let pointer = ActivePointer::new(storage.local().root());
        Self {
            ledger,
            storage,
            pointer,
        }
    }

    /// Build every tier from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a tier cannot be initialized.
    #[tracing::instrument(skip_all)]
    pub async fn from_config(
        config: &GenvaultConfig,
        ledger: Arc<dyn VersionLedger>,
    ) -> GenvaultResult<Self> {
        Ok(Self::new(ledger, open_storage(config).await?))
    }

    /// The hybrid storage.
    pub fn storage(&self) -> &HybridStorage {
        &self.storage
    }

    /// The version ledger.
    pub fn ledger(&self) -> &Arc<dyn VersionLedger> {
        &self.ledger
    }

    /// The active pointer manager.
    pub fn pointer(&self) -> &ActivePointer {
        &self.pointer
    }

    /// Persist one generation.
    ///
    /// Any failure after the version is reserved marks the generation
    /// `failed` and is returned; content already written stays on disk.
    /// Diff failures do not fail the save and are recorded in the summary.
    ///
    /// # Errors
    ///
    /// Returns the ledger error if reservation fails, or the storage error
    /// if the local write fails.
    #[tracing::instrument(
        skip(self, request),
        fields(project_id = %request.project_id, files = request.files.len(), activate = request.activate)
    )]
    pub async fn save(&self, request: GenerationRequest) -> GenvaultResult<SavedGeneration> {
        let draft = GenerationDraft::new(request.project_id)
            .with_prompt(request.prompt.clone())
            .with_parent(request.parent_generation_id);
        let reserved = self.ledger.next_version(draft).await?;
        tracing::info!(version = reserved.version, generation_id = %reserved.id, "Reserved version");

        let completion = match self.write_version(&reserved, &request).await {
            Ok(completion) => completion,
            Err(e) => return Err(self.fail(reserved.id, e).await),
        };

        let mut generation = match self.ledger.mark_completed(reserved.id, completion).await {
            Ok(generation) => generation,
            Err(e) => return Err(self.fail(reserved.id, e).await),
        };
        tracing::info!(version = generation.version, "Generation completed");

        let mut activation_error = None;
        if request.activate {
            match self.activate(generation.project_id, generation.id).await {
                Ok(activated) => generation = activated,
                Err(e) => {
                    tracing::warn!(error = %e, "Activation aborted, generation saved inactive");
                    activation_error = Some(e.to_string());
                }
            }
        }

        Ok(SavedGeneration {
            generation,
            activation_error,
        })
    }

    async fn write_version(
        &self,
        reserved: &Generation,
        request: &GenerationRequest,
    ) -> GenvaultResult<Completion> {
        let key = reserved.key();
        let annotations = VersionAnnotations {
            prompt: request.prompt.clone(),
            parent_generation_id: request.parent_generation_id,
        };
        let receipt = self.storage.save(&key, &request.files, &annotations).await?;
        let (diff_from_previous, changes_summary) = self.diff_previous(reserved, &receipt).await;

        Ok(Completion {
            storage_path: receipt.storage_path.display().to_string(),
            file_count: receipt.file_count,
            total_size_bytes: receipt.total_size_bytes,
            diff_from_previous,
            changes_summary,
        })
    }

    /// Diff against `version - 1` when that version still has a record.
    async fn diff_previous(
        &self,
        reserved: &Generation,
        receipt: &SaveReceipt,
    ) -> (Option<String>, Option<ChangesSummary>) {
        if reserved.version <= 1 {
            return (None, None);
        }

        let previous = match self
            .ledger
            .generation_by_version(reserved.project_id, reserved.version - 1)
            .await
        {
            Ok(Some(previous)) => previous,
            Ok(None) => {
                tracing::debug!("Previous version has no record, skipping diff");
                return (None, None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Previous version lookup failed");
                return (None, Some(ChangesSummary::failed(e.to_string())));
            }
        };

        let previous_dir = match self.storage.get(&previous.key()).await {
            Ok(resolved) => resolved.version_dir,
            Err(e) => {
                tracing::warn!(error = %e, version = previous.version, "Previous version not materialized");
                return (None, Some(ChangesSummary::failed(e.to_string())));
            }
        };

        let diff = match self
            .storage
            .local()
            .diff(&previous_dir, &receipt.storage_path)
            .await
        {
            Ok(diff) => diff,
            Err(e) => {
                tracing::warn!(error = %e, "Diff failed");
                return (None, Some(ChangesSummary::failed(e.to_string())));
            }
        };

        match self
            .storage
            .local()
            .write_diff(&receipt.storage_path, &diff.diff_text)
            .await
        {
            Ok(path) => {
                tracing::debug!(
                    added = diff.summary.added,
                    modified = diff.summary.modified,
                    removed = diff.summary.removed,
                    "Recorded diff against previous version"
                );
                (Some(path.display().to_string()), Some(diff.summary))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist diff artifact");
                (None, Some(ChangesSummary::failed(e.to_string())))
            }
        }
    }

    async fn fail(&self, generation_id: GenerationId, error: GenvaultError) -> GenvaultError {
        tracing::error!(%generation_id, error = %error, "Generation failed");
        if let Err(mark_error) = self.ledger.mark_failed(generation_id, &error.to_string()).await {
            tracing::error!(error = %mark_error, "Could not record generation failure");
        }
        error
    }

    /// Make a completed generation the project's active one.
    ///
    /// The ledger is updated first, then the filesystem pointer. If the
    /// pointer swap fails the ledger is restored to its previous active
    /// generation and the swap error is returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `InvalidState` from the ledger
    /// - `NotFound` if the version is not on local disk
    /// - `PointerSwapFailed` if the pointer could not be redirected
    #[tracing::instrument(skip(self))]
    pub async fn activate(
        &self,
        project_id: ProjectId,
        generation_id: GenerationId,
    ) -> GenvaultResult<Generation> {
        let previous = self.ledger.get_project(project_id).await?.active_generation_id;
        let generation = self.ledger.activate(project_id, generation_id).await?;

        if let Err(e) = self.pointer.set_active(&generation.key()).await {
            tracing::error!(error = %e, "Pointer swap failed, restoring previous activation");
            let restored = match previous {
                Some(previous) if previous == generation_id => Ok(()),
                Some(previous) => self
                    .ledger
                    .activate(project_id, previous)
                    .await
                    .map(|_| ()),
                None => self.ledger.deactivate(project_id).await.map(|_| ()),
            };
            if let Err(restore_error) = restored {
                tracing::error!(error = %restore_error, "Could not restore previous activation");
            }
            return Err(e);
        }

        tracing::info!(version = generation.version, "Activated generation");
        Ok(generation)
    }

    /// The project's active generation, if any.
    pub async fn active_generation(&self, project_id: ProjectId) -> GenvaultResult<Option<Generation>> {
        match self.ledger.get_project(project_id).await?.active_generation_id {
            Some(id) => Ok(Some(self.ledger.get_generation(id).await?)),
            None => Ok(None),
        }
    }

    /// Rebuild the filesystem pointer from the ledger.
    ///
    /// Returns the directory the pointer now targets, or `None` after
    /// removing the pointer of a project with no active generation.
    #[tracing::instrument(skip(self))]
    pub async fn repair_active_pointer(&self, project_id: ProjectId) -> GenvaultResult<Option<PathBuf>> {
        match self.active_generation(project_id).await? {
            Some(generation) => {
                let target = self.pointer.set_active(&generation.key()).await?;
                tracing::info!(version = generation.version, "Repaired active pointer");
                Ok(Some(target))
            }
            None => {
                self.pointer.clear(project_id).await?;
                tracing::info!("Cleared active pointer");
                Ok(None)
            }
        }
    }

    /// Diff two versions of a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either version has no record or no tier holds
    /// its content.
    #[tracing::instrument(skip(self))]
    pub async fn compare(
        &self,
        project_id: ProjectId,
        from_version: u32,
        to_version: u32,
    ) -> GenvaultResult<VersionDiff> {
        let from = self.require_version(project_id, from_version).await?;
        let to = self.require_version(project_id, to_version).await?;
        let from_dir = self.storage.get(&from.key()).await?.version_dir;
        let to_dir = self.storage.get(&to.key()).await?.version_dir;
        diff_versions(&from_dir, &to_dir).await
    }

    async fn require_version(&self, project_id: ProjectId, version: u32) -> GenvaultResult<Generation> {
        self.ledger
            .generation_by_version(project_id, version)
            .await?
            .ok_or_else(|| {
                LedgerError::new(LedgerErrorKind::NotFound(format!(
                    "version {version} of project {project_id}"
                )))
                .into()
            })
    }

    /// Every file of a completed generation, from whichever tier holds it.
    pub async fn read_files(&self, generation_id: GenerationId) -> GenvaultResult<FileSet> {
        let generation = self.require_completed(generation_id).await?;
        let resolved = self.storage.get(&generation.key()).await?;
        read_tree(&resolved.version_dir).await
    }

    /// A download locator for a completed generation.
    pub async fn download_url(
        &self,
        generation_id: GenerationId,
        ttl: Option<Duration>,
    ) -> GenvaultResult<DownloadLocator> {
        let generation = self.require_completed(generation_id).await?;
        Ok(self.storage.download_url(&generation.key(), ttl).await)
    }

    async fn require_completed(&self, generation_id: GenerationId) -> GenvaultResult<Generation> {
        let generation = self.ledger.get_generation(generation_id).await?;
        if generation.status != GenerationStatus::Completed {
            return Err(LedgerError::new(LedgerErrorKind::InvalidState(format!(
                "generation {} is {}, not completed",
                generation_id, generation.status
            )))
            .into());
        }
        Ok(generation)
    }

    /// Delete a generation record and its content.
    ///
    /// The ledger guards run first; content is only touched once the record
    /// is gone.
    ///
    /// # Errors
    ///
    /// `ActiveGenerationProtected` or `SoleGenerationProtected` from the
    /// ledger.
    #[tracing::instrument(skip(self))]
    pub async fn delete(
        &self,
        generation_id: GenerationId,
        targets: DeleteTargets,
    ) -> GenvaultResult<DeletedGeneration> {
        let generation = self.ledger.delete(generation_id).await?;
        let content_removed = self.storage.delete(&generation.key(), targets).await;
        tracing::info!(version = generation.version, content_removed, "Deleted generation");
        Ok(DeletedGeneration {
            generation,
            content_removed,
        })
    }

    /// Generations of a project ordered by version.
    pub async fn list_generations(&self, project_id: ProjectId) -> GenvaultResult<Vec<Generation>> {
        self.ledger.list_generations(project_id).await
    }

    /// One generation record.
    pub async fn get_generation(&self, generation_id: GenerationId) -> GenvaultResult<Generation> {
        self.ledger.get_generation(generation_id).await
    }

    /// One project record.
    pub async fn get_project(&self, project_id: ProjectId) -> GenvaultResult<Project> {
        self.ledger.get_project(project_id).await
    }
}

/// Build the hybrid storage described by `config`, with the cache sweeper
/// running on the current tokio runtime.
///
/// # Errors
///
/// Returns an error if the local root, cache root or cloud backend cannot
/// be initialized.
pub async fn open_storage(config: &GenvaultConfig) -> GenvaultResult<HybridStorage> {
    let local = LocalStore::new(config.storage().root().clone())?
        .with_write_timeout(config.storage().write_timeout());
    let cloud = CloudTier::from_config(config.cloud()).await?;
    let cache = CacheManager::from_config(config.cache())?;

    Ok(HybridStorage::new(local, cloud, cache)
        .with_cache_ttl(config.cache().ttl())
        .with_signed_url_ttl(config.cloud().signed_url_ttl())
        .with_replication(config.replication().clone())
        .with_download(config.download().clone())
        .with_cache_sweeper(config.cache().sweep_interval()))
}

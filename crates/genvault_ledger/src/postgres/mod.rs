//! PostgreSQL version ledger.
//!
//! Version assignment locks the project row with `SELECT ... FOR UPDATE`
//! inside the transaction that inserts the generation row, so concurrent
//! reservations for one project queue behind each other while other
//! projects proceed.

mod models;
pub mod schema;

use crate::{Completion, GenerationDraft, VersionLedger};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use genvault_core::{Generation, GenerationId, GenerationStatus, Project, ProjectId};
use genvault_error::{
    DatabaseError, DatabaseErrorKind, GenvaultError, GenvaultResult, LedgerError, LedgerErrorKind,
};
use models::{
    CompleteGenerationRow, GenerationRow, NewGenerationRow, NewProjectRow, ProjectRow, to_i32,
};
use schema::{genvault_generations, genvault_projects};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Migrations bundled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Establish a connection to `database_url`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if no URL is available or the connection fails.
pub fn establish_connection(database_url: Option<&str>) -> GenvaultResult<PgConnection> {
    let url = match database_url {
        Some(url) => url.to_string(),
        None => std::env::var("DATABASE_URL").map_err(|_| {
            DatabaseError::new(DatabaseErrorKind::Connection(
                "DATABASE_URL environment variable not set".to_string(),
            ))
        })?,
    };

    PgConnection::establish(&url)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())).into())
}

/// Apply any pending ledger migrations.
pub fn run_migrations(conn: &mut PgConnection) -> GenvaultResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))?;
    tracing::info!(count = applied.len(), "Applied ledger migrations");
    Ok(())
}

/// Failure inside a ledger transaction.
#[derive(Debug, derive_more::From)]
enum TxError {
    Diesel(diesel::result::Error),
    Database(DatabaseError),
    Ledger(LedgerError),
}

impl TxError {
    fn into_error(self) -> GenvaultError {
        match self {
            TxError::Diesel(e) => DatabaseError::from(e).into(),
            TxError::Database(e) => e.into(),
            TxError::Ledger(e) => e.into(),
        }
    }
}

fn not_found(what: String) -> TxError {
    LedgerError::new(LedgerErrorKind::NotFound(what)).into()
}

/// Ledger stored in PostgreSQL through Diesel.
///
/// # Example
///
/// ```no_run
/// use genvault_ledger::{PostgresVersionLedger, establish_connection, run_migrations};
///
/// # fn main() -> genvault_error::GenvaultResult<()> {
/// let mut conn = establish_connection(None)?;
/// run_migrations(&mut conn)?;
/// let ledger = PostgresVersionLedger::new(conn);
/// # Ok(())
/// # }
/// ```
pub struct PostgresVersionLedger {
    conn: Arc<Mutex<PgConnection>>,
}

impl PostgresVersionLedger {
    /// Wrap a connection.
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Share an existing connection.
    pub fn from_arc(conn: Arc<Mutex<PgConnection>>) -> Self {
        Self { conn }
    }
}

fn load_generation(conn: &mut PgConnection, id: GenerationId) -> Result<GenerationRow, TxError> {
    genvault_generations::table
        .find(id.as_uuid())
        .select(GenerationRow::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| not_found(format!("generation {id}")))
}

fn insert_project_if_missing(conn: &mut PgConnection, project_id: ProjectId) -> QueryResult<usize> {
    diesel::insert_into(genvault_projects::table)
        .values(&NewProjectRow {
            id: project_id.as_uuid(),
            latest_version: 0,
        })
        .on_conflict_do_nothing()
        .execute(conn)
}

#[async_trait]
impl VersionLedger for PostgresVersionLedger {
    async fn ensure_project(&self, project_id: ProjectId) -> GenvaultResult<Project> {
        let mut conn = self.conn.lock().await;
        let row: ProjectRow = conn.transaction::<_, TxError, _>(|conn| {
            insert_project_if_missing(conn, project_id)?;
            Ok(genvault_projects::table
                .find(project_id.as_uuid())
                .select(ProjectRow::as_select())
                .first(conn)?)
        })
        .map_err(TxError::into_error)?;
        Ok(row.into())
    }

    #[tracing::instrument(skip(self, draft), fields(project_id = %draft.project_id))]
    async fn next_version(&self, draft: GenerationDraft) -> GenvaultResult<Generation> {
        let mut conn = self.conn.lock().await;

        let row = conn.transaction::<_, TxError, _>(|conn| {
            insert_project_if_missing(conn, draft.project_id)?;

            let project: ProjectRow = genvault_projects::table
                .find(draft.project_id.as_uuid())
                .select(ProjectRow::as_select())
                .for_update()
                .first(conn)?;
            let version = project.latest_version + 1;

            diesel::update(genvault_projects::table.find(project.id))
                .set(genvault_projects::latest_version.eq(version))
                .execute(conn)?;

            let inserted = diesel::insert_into(genvault_generations::table)
                .values(&NewGenerationRow {
                    id: draft.generation_id.as_uuid(),
                    project_id: project.id,
                    version,
                    status: GenerationStatus::Processing.as_str().to_string(),
                    parent_generation_id: draft.parent_generation_id.map(|id| id.as_uuid()),
                    prompt: draft.prompt.clone(),
                })
                .returning(GenerationRow::as_returning())
                .get_result(conn);

            match inserted {
                Ok(row) => Ok(row),
                Err(diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    info,
                )) => Err(LedgerError::new(LedgerErrorKind::VersionConflict(
                    info.message().to_string(),
                ))
                .into()),
                Err(e) => Err(e.into()),
            }
        })
        .map_err(TxError::into_error)?;

        let generation = Generation::try_from(row)?;
        tracing::info!(version = generation.version, generation_id = %generation.id, "Reserved version");
        Ok(generation)
    }

    async fn mark_completed(
        &self,
        generation_id: GenerationId,
        completion: Completion,
    ) -> GenvaultResult<Generation> {
        let mut conn = self.conn.lock().await;

        let row = conn.transaction::<_, TxError, _>(|conn| {
            let current = load_generation(conn, generation_id)?;
            let status: GenerationStatus = current.status.parse().map_err(|_| {
                DatabaseError::new(DatabaseErrorKind::Serialization(current.status.clone()))
            })?;
            if status.is_terminal() {
                return Err(LedgerError::new(LedgerErrorKind::InvalidState(format!(
                    "generation {generation_id} is already {status}"
                )))
                .into());
            }

            let changes_summary = completion
                .changes_summary
                .as_ref()
                .map(serde_json::to_value)
                .transpose()
                .map_err(DatabaseError::from)?;
            let changeset = CompleteGenerationRow {
                status: GenerationStatus::Completed.as_str().to_string(),
                storage_path: Some(completion.storage_path.clone()),
                file_count: to_i32(completion.file_count, "file_count")?,
                total_size_bytes: i64::try_from(completion.total_size_bytes).map_err(|_| {
                    DatabaseError::new(DatabaseErrorKind::Serialization(
                        "total_size_bytes exceeds BIGINT range".to_string(),
                    ))
                })?,
                diff_from_previous: completion.diff_from_previous.clone(),
                changes_summary,
                completed_at: Some(Utc::now()),
            };

            Ok(diesel::update(genvault_generations::table.find(generation_id.as_uuid()))
                .set(&changeset)
                .returning(GenerationRow::as_returning())
                .get_result(conn)?)
        })
        .map_err(TxError::into_error)?;

        Ok(Generation::try_from(row)?)
    }

    async fn mark_failed(
        &self,
        generation_id: GenerationId,
        message: &str,
    ) -> GenvaultResult<Generation> {
        let mut conn = self.conn.lock().await;

        let row: Option<GenerationRow> =
            diesel::update(genvault_generations::table.find(generation_id.as_uuid()))
                .set((
                    genvault_generations::status.eq(GenerationStatus::Failed.as_str()),
                    genvault_generations::error_message.eq(Some(message)),
                    genvault_generations::completed_at.eq(Some(Utc::now())),
                ))
                .returning(GenerationRow::as_returning())
                .get_result(&mut *conn)
                .optional()
                .map_err(DatabaseError::from)?;

        let row = row.ok_or_else(|| {
            LedgerError::new(LedgerErrorKind::NotFound(format!("generation {generation_id}")))
        })?;
        tracing::warn!(%generation_id, message, "Generation marked failed");
        Ok(Generation::try_from(row)?)
    }

    #[tracing::instrument(skip(self))]
    async fn activate(
        &self,
        project_id: ProjectId,
        generation_id: GenerationId,
    ) -> GenvaultResult<Generation> {
        let mut conn = self.conn.lock().await;

        let row = conn.transaction::<_, TxError, _>(|conn| {
            let target = load_generation(conn, generation_id)?;
            if target.project_id != project_id.as_uuid() {
                return Err(not_found(format!(
                    "generation {generation_id} in project {project_id}"
                )));
            }
            if target.status != GenerationStatus::Completed.as_str() {
                return Err(LedgerError::new(LedgerErrorKind::InvalidState(format!(
                    "generation {} is {}, not completed",
                    generation_id, target.status
                )))
                .into());
            }

            let _locked: ProjectRow = genvault_projects::table
                .find(project_id.as_uuid())
                .select(ProjectRow::as_select())
                .for_update()
                .first(conn)?;

            diesel::update(
                genvault_generations::table
                    .filter(genvault_generations::project_id.eq(project_id.as_uuid()))
                    .filter(genvault_generations::is_active.eq(true))
                    .filter(genvault_generations::id.ne(generation_id.as_uuid())),
            )
            .set(genvault_generations::is_active.eq(false))
            .execute(conn)?;

            let activated = diesel::update(genvault_generations::table.find(generation_id.as_uuid()))
                .set(genvault_generations::is_active.eq(true))
                .returning(GenerationRow::as_returning())
                .get_result(conn)?;

            diesel::update(genvault_projects::table.find(project_id.as_uuid()))
                .set(genvault_projects::active_generation_id.eq(Some(generation_id.as_uuid())))
                .execute(conn)?;

            Ok(activated)
        })
        .map_err(TxError::into_error)?;

        let generation = Generation::try_from(row)?;
        tracing::info!(version = generation.version, "Activated generation");
        Ok(generation)
    }

    #[tracing::instrument(skip(self))]
    async fn deactivate(&self, project_id: ProjectId) -> GenvaultResult<Option<Generation>> {
        let mut conn = self.conn.lock().await;

        let rows = conn
            .transaction::<_, TxError, _>(|conn| {
                let _locked: ProjectRow = genvault_projects::table
                    .find(project_id.as_uuid())
                    .select(ProjectRow::as_select())
                    .for_update()
                    .first(conn)?;

                let cleared: Vec<GenerationRow> = diesel::update(
                    genvault_generations::table
                        .filter(genvault_generations::project_id.eq(project_id.as_uuid()))
                        .filter(genvault_generations::is_active.eq(true)),
                )
                .set(genvault_generations::is_active.eq(false))
                .returning(GenerationRow::as_returning())
                .get_results(conn)?;

                diesel::update(genvault_projects::table.find(project_id.as_uuid()))
                    .set(genvault_projects::active_generation_id.eq(None::<uuid::Uuid>))
                    .execute(conn)?;

                Ok(cleared)
            })
            .map_err(TxError::into_error)?;

        match rows.into_iter().next() {
            Some(row) => {
                let generation = Generation::try_from(row)?;
                tracing::info!(version = generation.version, "Deactivated generation");
                Ok(Some(generation))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, generation_id: GenerationId) -> GenvaultResult<Generation> {
        let mut conn = self.conn.lock().await;

        let row = conn.transaction::<_, TxError, _>(|conn| {
            let target = load_generation(conn, generation_id)?;
            if target.is_active {
                return Err(LedgerError::new(LedgerErrorKind::ActiveGenerationProtected(
                    generation_id.to_string(),
                ))
                .into());
            }

            let siblings: i64 = genvault_generations::table
                .filter(genvault_generations::project_id.eq(target.project_id))
                .count()
                .get_result(conn)?;
            if siblings <= 1 {
                return Err(LedgerError::new(LedgerErrorKind::SoleGenerationProtected(
                    generation_id.to_string(),
                ))
                .into());
            }

            diesel::delete(genvault_generations::table.find(target.id)).execute(conn)?;
            Ok(target)
        })
        .map_err(TxError::into_error)?;

        let generation = Generation::try_from(row)?;
        tracing::info!(version = generation.version, "Deleted generation record");
        Ok(generation)
    }

    async fn get_generation(&self, generation_id: GenerationId) -> GenvaultResult<Generation> {
        let mut conn = self.conn.lock().await;
        let row = load_generation(&mut conn, generation_id).map_err(TxError::into_error)?;
        Ok(Generation::try_from(row)?)
    }

    async fn get_project(&self, project_id: ProjectId) -> GenvaultResult<Project> {
        let mut conn = self.conn.lock().await;
        let row: Option<ProjectRow> = genvault_projects::table
            .find(project_id.as_uuid())
            .select(ProjectRow::as_select())
            .first(&mut *conn)
            .optional()
            .map_err(DatabaseError::from)?;
        row.map(Project::from).ok_or_else(|| {
            LedgerError::new(LedgerErrorKind::NotFound(format!("project {project_id}"))).into()
        })
    }

    async fn list_generations(&self, project_id: ProjectId) -> GenvaultResult<Vec<Generation>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<GenerationRow> = genvault_generations::table
            .filter(genvault_generations::project_id.eq(project_id.as_uuid()))
            .order(genvault_generations::version.asc())
            .select(GenerationRow::as_select())
            .load(&mut *conn)
            .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| Generation::try_from(row).map_err(GenvaultError::from))
            .collect()
    }

    async fn generation_by_version(
        &self,
        project_id: ProjectId,
        version: u32,
    ) -> GenvaultResult<Option<Generation>> {
        let mut conn = self.conn.lock().await;
        let version = to_i32(version, "version")?;
        let row: Option<GenerationRow> = genvault_generations::table
            .filter(genvault_generations::project_id.eq(project_id.as_uuid()))
            .filter(genvault_generations::version.eq(version))
            .select(GenerationRow::as_select())
            .first(&mut *conn)
            .optional()
            .map_err(DatabaseError::from)?;

        row.map(Generation::try_from)
            .transpose()
            .map_err(GenvaultError::from)
    }
}

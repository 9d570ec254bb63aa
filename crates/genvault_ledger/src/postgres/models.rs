//! Diesel rows for the ledger tables and their conversions.

use super::schema::{genvault_generations, genvault_projects};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use genvault_core::{ChangesSummary, Generation, GenerationStatus, Project};
use genvault_error::{DatabaseError, DatabaseErrorKind};
use uuid::Uuid;

/// Database row for `genvault_projects`.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = genvault_projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProjectRow {
    pub id: Uuid,
    pub latest_version: i32,
    pub active_generation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Insertable project registration.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = genvault_projects)]
pub struct NewProjectRow {
    pub id: Uuid,
    pub latest_version: i32,
}

/// Database row for `genvault_generations`.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = genvault_generations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GenerationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version: i32,
    pub status: String,
    pub is_active: bool,
    pub storage_path: Option<String>,
    pub file_count: i32,
    pub total_size_bytes: i64,
    pub diff_from_previous: Option<String>,
    pub changes_summary: Option<serde_json::Value>,
    pub parent_generation_id: Option<Uuid>,
    pub prompt: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insertable reserved generation.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = genvault_generations)]
pub struct NewGenerationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub version: i32,
    pub status: String,
    pub parent_generation_id: Option<Uuid>,
    pub prompt: Option<String>,
}

/// Completion changeset.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = genvault_generations)]
pub struct CompleteGenerationRow {
    pub status: String,
    pub storage_path: Option<String>,
    pub file_count: i32,
    pub total_size_bytes: i64,
    pub diff_from_previous: Option<String>,
    pub changes_summary: Option<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id.into(),
            latest_version: u32::try_from(row.latest_version).unwrap_or(0),
            active_generation_id: row.active_generation_id.map(Into::into),
            created_at: row.created_at,
        }
    }
}

impl TryFrom<GenerationRow> for Generation {
    type Error = DatabaseError;

    fn try_from(row: GenerationRow) -> Result<Self, Self::Error> {
        let status: GenerationStatus = row.status.parse().map_err(|_| {
            DatabaseError::new(DatabaseErrorKind::Serialization(format!(
                "unknown generation status '{}'",
                row.status
            )))
        })?;
        let changes_summary = row
            .changes_summary
            .map(serde_json::from_value::<ChangesSummary>)
            .transpose()?;

        Ok(Generation {
            id: row.id.into(),
            project_id: row.project_id.into(),
            version: to_u32(row.version, "version")?,
            status,
            is_active: row.is_active,
            storage_path: row.storage_path,
            file_count: to_u32(row.file_count, "file_count")?,
            total_size_bytes: u64::try_from(row.total_size_bytes).map_err(|_| {
                DatabaseError::new(DatabaseErrorKind::Serialization(
                    "negative total_size_bytes".to_string(),
                ))
            })?,
            diff_from_previous: row.diff_from_previous,
            changes_summary,
            parent_generation_id: row.parent_generation_id.map(Into::into),
            prompt: row.prompt,
            error_message: row.error_message,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

fn to_u32(value: i32, column: &str) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "negative {column}: {value}"
        )))
    })
}

/// Convert an unsigned count into an `INTEGER` column value.
pub fn to_i32(value: u32, column: &str) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "{column} {value} exceeds INTEGER range"
        )))
    })
}

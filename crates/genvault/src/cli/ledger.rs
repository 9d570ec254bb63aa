//! Handlers for commands backed by the PostgreSQL ledger.

use super::OutputFormat;
use genvault::{
    FileSet, GenerationId, GenerationRequest, GenerationService, GenvaultConfig, ProjectId,
    PostgresVersionLedger, establish_connection, run_migrations,
};
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

async fn service(config: &GenvaultConfig) -> Result<GenerationService, Box<dyn std::error::Error>> {
    let mut conn = establish_connection(config.database().url().as_deref())?;
    run_migrations(&mut conn)?;
    let ledger = Arc::new(PostgresVersionLedger::new(conn));
    Ok(GenerationService::from_config(config, ledger).await?)
}

fn load_files(dir: &Path) -> Result<FileSet, Box<dyn std::error::Error>> {
    let mut files = FileSet::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(key, std::fs::read(entry.path())?);
    }
    Ok(files)
}

/// Save a directory as the next version of a project.
pub async fn save(
    config: &GenvaultConfig,
    project: &str,
    dir: &Path,
    prompt: Option<String>,
    activate: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id: ProjectId = project.parse()?;
    let files = load_files(dir)?;
    let request = GenerationRequest::builder()
        .project_id(project_id)
        .files(files)
        .prompt(prompt)
        .activate(activate)
        .build()?;

    let service = service(config).await?;
    let saved = service.save(request).await?;
    service.storage().flush_replication().await;

    let generation = &saved.generation;
    println!(
        "Saved v{} ({}) with {} files, {} bytes",
        generation.version, generation.id, generation.file_count, generation.total_size_bytes
    );
    if let Some(summary) = &generation.changes_summary {
        println!(
            "Changes: {} added, {} modified, {} removed",
            summary.added, summary.modified, summary.removed
        );
    }
    if let Some(reason) = &saved.activation_error {
        println!("Activation aborted: {reason}");
    } else if saved.is_active() {
        println!("Activated");
    }
    Ok(())
}

/// Activate a completed generation.
pub async fn activate(
    config: &GenvaultConfig,
    project: &str,
    generation: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id: ProjectId = project.parse()?;
    let generation_id: GenerationId = generation.parse()?;
    let activated = service(config).await?.activate(project_id, generation_id).await?;
    println!("Activated v{} ({})", activated.version, activated.id);
    Ok(())
}

/// List a project's generations.
pub async fn list(
    config: &GenvaultConfig,
    project: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id: ProjectId = project.parse()?;
    let generations = service(config).await?.list_generations(project_id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generations)?),
        OutputFormat::Human => {
            if generations.is_empty() {
                println!("No generations");
            }
            for generation in generations {
                let marker = if generation.is_active { "*" } else { " " };
                println!(
                    "{} v{:<4} {:<10} {:>5} files  {}",
                    marker,
                    generation.version,
                    generation.status,
                    generation.file_count,
                    generation.id
                );
            }
        }
    }
    Ok(())
}

//! Genvault CLI binary.
//!
//! This binary provides command-line access to genvault's storage engine:
//! - Diff version directories and inspect manifests
//! - Inspect active pointers
//! - Maintain the download cache and replication outbox
//! - Save, activate and list generations (feature `database`)

use clap::Parser;
use genvault::{GenvaultConfig, init_logging};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands};

    // Load .env before configuration so GENVAULT__* variables apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = GenvaultConfig::load_with(cli.config.as_deref())?;

    let mut logging = config.logging().clone();
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    init_logging(&logging)?;

    match cli.command {
        Commands::Diff { from, to, format } => {
            cli::diff(&from, &to, format).await?;
        }

        Commands::Manifest { version_dir } => {
            cli::manifest(&version_dir).await?;
        }

        Commands::Active { project_id } => {
            cli::active(&config, &project_id).await?;
        }

        Commands::Evict { ttl_secs } => {
            cli::evict(&config, ttl_secs).await?;
        }

        Commands::Replicate => {
            cli::replicate(&config).await?;
        }

        #[cfg(feature = "database")]
        Commands::Save {
            project,
            dir,
            prompt,
            activate,
        } => {
            cli::save(&config, &project, &dir, prompt, activate).await?;
        }

        #[cfg(feature = "database")]
        Commands::Activate {
            project,
            generation,
        } => {
            cli::activate(&config, &project, &generation).await?;
        }

        #[cfg(feature = "database")]
        Commands::List { project, format } => {
            cli::list(&config, &project, format).await?;
        }
    }

    Ok(())
}

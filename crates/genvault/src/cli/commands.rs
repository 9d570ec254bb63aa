//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Genvault - versioned hybrid storage for generated code
#[derive(Parser, Debug)]
#[command(name = "genvault")]
#[command(about = "Versioned hybrid storage for generated code", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the standard locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diff two version directories
    Diff {
        /// Older version directory
        from: PathBuf,

        /// Newer version directory
        to: PathBuf,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Print the manifest of a version directory
    Manifest {
        /// Version directory holding manifest.json
        version_dir: PathBuf,
    },

    /// Show the version a project's active pointer targets
    Active {
        /// Project identifier
        project_id: String,
    },

    /// Evict stale entries from the download cache
    Evict {
        /// Maximum entry age in seconds (defaults to the configured TTL)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// Retry replications parked in the outbox
    Replicate,

    /// Save a directory of files as the next version of a project
    #[cfg(feature = "database")]
    Save {
        /// Project identifier
        #[arg(long)]
        project: String,

        /// Directory whose files make up the generation
        #[arg(long)]
        dir: PathBuf,

        /// Prompt text recorded in the manifest
        #[arg(long)]
        prompt: Option<String>,

        /// Activate the generation once saved
        #[arg(long)]
        activate: bool,
    },

    /// Activate a completed generation
    #[cfg(feature = "database")]
    Activate {
        /// Project identifier
        project: String,

        /// Generation identifier
        generation: String,
    },

    /// List the generations of a project
    #[cfg(feature = "database")]
    List {
        /// Project identifier
        project: String,

        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the genvault binary.

mod commands;
mod handlers;
#[cfg(feature = "database")]
mod ledger;

pub use commands::{Cli, Commands, OutputFormat};
pub use handlers::{active, diff, evict, manifest, replicate};
#[cfg(feature = "database")]
pub use ledger::{activate, list, save};

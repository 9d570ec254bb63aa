//! Version ledger for genvault.
//!
//! The ledger is the authoritative record of which versions a project has
//! assigned, what state each generation is in, and which generation is
//! active. Two implementations are provided:
//!
//! - [`InMemoryVersionLedger`] for tests and single-process use
//! - `PostgresVersionLedger` (feature `database`) backed by Diesel

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ledger;
mod memory;
#[cfg(feature = "database")]
mod postgres;

pub use ledger::{Completion, GenerationDraft, VersionLedger};
pub use memory::InMemoryVersionLedger;
#[cfg(feature = "database")]
pub use postgres::{
    MIGRATIONS, PostgresVersionLedger, establish_connection, run_migrations, schema,
};

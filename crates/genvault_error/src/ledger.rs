//! Version ledger error types.

/// Ledger error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum LedgerErrorKind {
    /// Project or generation does not exist, or does not belong to the project
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Operation is not valid for the generation's current status
    #[display("Invalid state: {}", _0)]
    InvalidState(String),
    /// The active generation cannot be deleted
    #[display("Generation {} is active and cannot be deleted", _0)]
    ActiveGenerationProtected(String),
    /// A project's only generation cannot be deleted
    #[display("Generation {} is the project's only generation", _0)]
    SoleGenerationProtected(String),
    /// Two writers raced for the same version number
    #[display("Version conflict: {}", _0)]
    VersionConflict(String),
    /// Underlying record store failure
    #[display("Ledger backend error: {}", _0)]
    Backend(String),
}

/// Ledger error with source location tracking.
///
/// # Examples
///
/// ```
/// use genvault_error::{LedgerError, LedgerErrorKind};
///
/// let err = LedgerError::new(LedgerErrorKind::InvalidState("pending".into()));
/// assert!(format!("{}", err).contains("Invalid state"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Ledger Error: {} at line {} in {}", kind, line, file)]
pub struct LedgerError {
    /// The kind of error that occurred
    pub kind: LedgerErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl LedgerError {
    /// Create a new LedgerError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: LedgerErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error reports a missing project or generation.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, LedgerErrorKind::NotFound(_))
    }
}

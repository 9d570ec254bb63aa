//! Local storage error types.

/// Kinds of local storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// A relative path would escape the version root
    #[display("Invalid path: {}", _0)]
    InvalidPath(String),
    /// Failed to create a storage directory
    #[display("Failed to create storage directory: {}", _0)]
    DirectoryCreation(String),
    /// Local I/O failed while writing a version
    #[display("Write failure: {}", _0)]
    WriteFailure(String),
    /// Failed to read a stored file
    #[display("Failed to read file: {}", _0)]
    FileRead(String),
    /// Version, file, or directory is not present
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Manifest could not be parsed or failed its structural check
    #[display("Corrupt manifest: {}", _0)]
    CorruptManifest(String),
    /// The active reference rename did not complete
    #[display("Active pointer swap failed: {}", _0)]
    PointerSwapFailed(String),
    /// Local operation exceeded its deadline
    #[display("Storage operation timed out: {}", _0)]
    Timeout(String),
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use genvault_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("/path/to/file".to_string()));
/// assert!(format!("{}", err).contains("Not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether this error reports missing content.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NotFound(_))
    }
}

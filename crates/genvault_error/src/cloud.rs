//! Cloud tier error types.

/// Kinds of cloud tier errors.
///
/// These never escape a save: the hybrid coordinator logs them and degrades
/// to the local tier. They surface only from direct adapter calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CloudErrorKind {
    /// Packing or unpacking a version archive failed
    #[display("Archive error: {}", _0)]
    Archive(String),
    /// Object upload failed
    #[display("Upload failed: {}", _0)]
    Upload(String),
    /// Object download failed
    #[display("Download failed: {}", _0)]
    Download(String),
    /// Remote object is absent
    #[display("Object not found: {}", _0)]
    NotFound(String),
    /// Object deletion failed
    #[display("Delete failed: {}", _0)]
    Delete(String),
    /// Signed URL could not be issued
    #[display("Presign failed: {}", _0)]
    Presign(String),
    /// Operation exceeded its deadline
    #[display("Cloud operation timed out: {}", _0)]
    Timeout(String),
    /// Backend configuration is unusable
    #[display("Invalid cloud configuration: {}", _0)]
    InvalidConfig(String),
}

/// Cloud tier error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Cloud Error: {} at line {} in {}", kind, line, file)]
pub struct CloudError {
    /// The kind of error that occurred
    pub kind: CloudErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CloudError {
    /// Create a new cloud error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CloudErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

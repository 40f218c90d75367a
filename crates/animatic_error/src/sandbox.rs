//! Sandbox error types.

/// Kinds of sandbox errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum SandboxErrorKind {
    /// Sandbox could not be provisioned
    #[display("Failed to create sandbox: {}", _0)]
    Create(String),
    /// Command could not be started or awaited
    #[display("Command '{}' failed to run: {}", command, message)]
    Command {
        /// Command line
        command: String,
        /// Failure description
        message: String,
    },
    /// File could not be read or written
    #[display("File operation on '{}' failed: {}", path, message)]
    FileIo {
        /// Path inside the sandbox
        path: String,
        /// Failure description
        message: String,
    },
    /// Path escapes the sandbox
    #[display("Path escapes sandbox: {}", _0)]
    InvalidPath(String),
    /// Teardown failed
    #[display("Failed to destroy sandbox: {}", _0)]
    Destroy(String),
    /// Command exceeded its time limit
    #[display("Command '{}' timed out after {}ms", command, elapsed_ms)]
    Timeout {
        /// Command line
        command: String,
        /// Elapsed time before the kill
        elapsed_ms: u64,
    },
}

/// Sandbox error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Sandbox Error: {} at line {} in {}", kind, line, file)]
pub struct SandboxError {
    /// The kind of error that occurred
    pub kind: SandboxErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl SandboxError {
    /// Create a new sandbox error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SandboxErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

//! Checkpoint log error types.

/// Kinds of checkpoint errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CheckpointErrorKind {
    /// Value could not be encoded or decoded
    #[display("Checkpoint '{}' could not be serialized: {}", key, message)]
    Serialize {
        /// Checkpoint key
        key: String,
        /// Serializer message
        message: String,
    },
    /// Backing store failed
    #[display("Checkpoint storage failed: {}", _0)]
    Storage(String),
}

/// Checkpoint error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Checkpoint Error: {} at line {} in {}", kind, line, file)]
pub struct CheckpointError {
    /// The kind of error that occurred
    pub kind: CheckpointErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CheckpointError {
    /// Create a new checkpoint error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CheckpointErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

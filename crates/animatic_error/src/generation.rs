//! Script generation error types.

/// Kinds of generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Repair call produced no script
    #[display("Script repair returned empty on attempt {}", attempt)]
    EmptyRepair {
        /// Fix loop attempt number
        attempt: u32,
    },
    /// Regeneration produced no script
    #[display(
        "Script regeneration returned empty on attempt {} after {} calls",
        attempt,
        calls
    )]
    EmptyRegeneration {
        /// Render attempt number
        attempt: u32,
        /// Calls made so far
        calls: u32,
    },
    /// Model or provider failure
    #[display("Generation provider failed: {}", _0)]
    Provider(String),
}

/// Generation error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new generation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Whether the collaborator answered with an empty script rather than failing.
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self.kind,
            GenerationErrorKind::EmptyRepair { .. } | GenerationErrorKind::EmptyRegeneration { .. }
        )
    }
}

//! Non-retryable job failures.

/// Kinds of terminal job failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum JobErrorKind {
    /// Script is empty or its issues cannot be auto-fixed
    #[display("Script cannot be fixed: {}", _0)]
    UnfixableScript(String),
    /// Repair call returned nothing
    #[display("Script repair returned empty on attempt {}", attempt)]
    EmptyRepair {
        /// Fix loop attempt number
        attempt: u32,
    },
    /// Regeneration kept returning nothing
    #[display(
        "Script regeneration returned empty on attempt {} after {} calls",
        attempt,
        calls
    )]
    RegenerationExhausted {
        /// Render attempt that triggered regeneration
        attempt: u32,
        /// Calls made before giving up
        calls: u32,
    },
    /// Generator failed outright
    #[display("Script generation failed: {}", _0)]
    GenerationFailed(String),
    /// Every render attempt failed
    #[display("Render failed after {} attempts: {}", attempts, last_message)]
    RenderExhausted {
        /// Render attempts made
        attempts: u32,
        /// Message of the most recent failure
        last_message: String,
    },
    /// Video rendered but could not be uploaded
    #[display("Upload failed after successful render: {}", _0)]
    UploadFailed(String),
    /// Final state or downstream handoff failed
    #[display("Finalization failed: {}", _0)]
    FinalizeFailed(String),
}

/// Terminal, non-retryable job error with location tracking.
///
/// # Examples
///
/// ```
/// use animatic_error::{JobError, JobErrorKind};
///
/// let err = JobError::new(JobErrorKind::RenderExhausted {
///     attempts: 3,
///     last_message: "missing output".to_string(),
/// });
/// assert!(format!("{}", err).contains("after 3 attempts: missing output"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Job Error: {} at line {} in {}", kind, line, file)]
pub struct JobError {
    /// The kind of error that occurred
    pub kind: JobErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl JobError {
    /// Create a new job error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: JobErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

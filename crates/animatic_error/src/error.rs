//! Top-level error wrapper types.

use crate::{CheckpointError, ConfigError, GenerationError, JobError, SandboxError, StageError};

/// User-facing text persisted for failed jobs. Stage output stays in logs.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "We couldn't create your video this time. Please try again.";

/// Every error the animatic crates propagate.
///
/// # Examples
///
/// ```
/// use animatic_error::{AnimaticError, ConfigError};
///
/// let err: AnimaticError = ConfigError::new("bad value").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum AnimaticErrorKind {
    /// Render stage failure
    #[from(StageError)]
    Stage(StageError),
    /// Script generation failure
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Terminal job failure
    #[from(JobError)]
    Job(JobError),
    /// Sandbox failure
    #[from(SandboxError)]
    Sandbox(SandboxError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Checkpoint log failure
    #[from(CheckpointError)]
    Checkpoint(CheckpointError),
}

/// Animatic error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Animatic Error: {}", _0)]
pub struct AnimaticError(Box<AnimaticErrorKind>);

impl AnimaticError {
    /// Create a new error from a kind.
    pub fn new(kind: AnimaticErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &AnimaticErrorKind {
        &self.0
    }

    /// The job error, if this is one.
    pub fn as_job_error(&self) -> Option<&JobError> {
        match self.kind() {
            AnimaticErrorKind::Job(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the hosting engine should stop instead of retrying the block.
    pub fn is_non_retryable(&self) -> bool {
        self.as_job_error().is_some()
    }

    /// Message safe to show end users.
    pub fn user_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

// Generic From implementation for any type that converts to AnimaticErrorKind
impl<T> From<T> for AnimaticError
where
    T: Into<AnimaticErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for animatic operations.
pub type AnimaticResult<T> = std::result::Result<T, AnimaticError>;

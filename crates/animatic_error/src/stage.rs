//! Render stage failures.

use animatic_core::{ErrorDetails, ErrorDetailsBuilder, ValidationStage};

/// A render pipeline stage failed.
///
/// Fatal to the current attempt only. Carries fully built [`ErrorDetails`];
/// nothing is attached after construction.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Stage Error [{}]: {} at line {} in {}", stage, details, line, file)]
pub struct StageError {
    /// Stage that failed
    pub stage: ValidationStage,
    /// Structured failure context
    pub details: ErrorDetails,
    /// Line number where the error was created
    pub line: u32,
    /// File where the error was created
    pub file: &'static str,
}

impl StageError {
    /// Build the error for a stage, tagging the details and filling in the
    /// stage's default hint when none was given.
    ///
    /// # Examples
    ///
    /// ```
    /// use animatic_core::{ErrorDetails, ValidationStage};
    /// use animatic_error::StageError;
    ///
    /// let err = StageError::new(ValidationStage::Syntax, ErrorDetails::builder("invalid syntax"));
    /// assert_eq!(err.details.stage(), Some(ValidationStage::Syntax));
    /// assert!(err.details.hint().is_some());
    /// ```
    #[track_caller]
    pub fn new(stage: ValidationStage, details: ErrorDetailsBuilder) -> Self {
        let location = std::panic::Location::caller();
        Self {
            stage,
            details: details.stage(stage).or_hint(stage.default_hint()).build(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Stage error carrying only a message.
    #[track_caller]
    pub fn message_only(stage: ValidationStage, message: impl Into<String>) -> Self {
        Self::new(stage, ErrorDetails::builder(message))
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        self.details.message()
    }

    /// Consume into the details.
    pub fn into_details(self) -> ErrorDetails {
        self.details
    }
}

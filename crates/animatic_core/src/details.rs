//! Structured failure details captured at the failure boundary.

use crate::{RenderLogEntry, ValidationStage};
use serde::{Deserialize, Serialize};

/// Maximum characters kept for `stack`, `stderr` and `stdout`.
pub const MAX_OUTPUT_CHARS: usize = 2000;

/// Maximum log entries kept on a failure.
pub const MAX_LOG_ENTRIES: usize = 50;

/// Keep at most the last `max` characters of `text`.
///
/// Tracebacks and tool output end with the interesting part, so the tail is
/// kept rather than the head. Slicing respects char boundaries.
pub fn clamp_tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}

fn clamp_optional(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
        .map(|t| clamp_tail(&t, MAX_OUTPUT_CHARS))
}

/// Structured description of one failure.
///
/// Built exactly once through [`ErrorDetailsBuilder`], which enforces the
/// output and log bounds. There are no setters; consumers read a closed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[serde(from = "ErrorDetailsBuilder")]
#[display("{}", message)]
pub struct ErrorDetails {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<ValidationStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<Vec<RenderLogEntry>>,
}

impl ErrorDetails {
    /// Start building details for a failure message.
    pub fn builder(message: impl Into<String>) -> ErrorDetailsBuilder {
        ErrorDetailsBuilder::default().message(message)
    }

    /// Details carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::builder(message).build()
    }

    /// Human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Clamped stack trace, if any.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Clamped standard error, if any.
    pub fn stderr(&self) -> Option<&str> {
        self.stderr.as_deref()
    }

    /// Clamped standard output, if any.
    pub fn stdout(&self) -> Option<&str> {
        self.stdout.as_deref()
    }

    /// Process exit code, if a command failed.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Stage the failure was raised at.
    pub fn stage(&self) -> Option<ValidationStage> {
        self.stage
    }

    /// Remediation hint for the generator.
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Tail of the render log at the time of failure.
    pub fn logs(&self) -> Option<&[RenderLogEntry]> {
        self.logs.as_deref()
    }

    /// One-line summary: `[stage] message`.
    pub fn summary(&self) -> String {
        match self.stage {
            Some(stage) => format!("[{}] {}", stage, self.message),
            None => self.message.clone(),
        }
    }
}

/// Builder for [`ErrorDetails`].
///
/// Also the deserialization shape, so details read back from a checkpoint
/// pass through the same clamping as freshly built ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorDetailsBuilder {
    message: String,
    stack: Option<String>,
    stderr: Option<String>,
    stdout: Option<String>,
    exit_code: Option<i32>,
    stage: Option<ValidationStage>,
    hint: Option<String>,
    logs: Option<Vec<RenderLogEntry>>,
}

impl ErrorDetailsBuilder {
    /// Set the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the stack trace.
    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Set captured standard error.
    pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    /// Set captured standard output.
    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    /// Set the exit code.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Set the exit code when one is known.
    pub fn maybe_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Tag with a stage.
    pub fn stage(mut self, stage: ValidationStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Set the hint.
    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Set the hint unless a non-blank one is already present.
    pub fn or_hint(mut self, hint: impl Into<String>) -> Self {
        if self.hint.as_deref().is_none_or(|h| h.trim().is_empty()) {
            self.hint = Some(hint.into());
        }
        self
    }

    /// Attach log entries. Only the last [`MAX_LOG_ENTRIES`] are kept.
    pub fn logs(mut self, logs: Vec<RenderLogEntry>) -> Self {
        self.logs = Some(logs);
        self
    }

    /// The message set so far.
    pub fn current_message(&self) -> &str {
        &self.message
    }

    /// The stage set so far.
    pub fn current_stage(&self) -> Option<ValidationStage> {
        self.stage
    }

    /// Finish construction, enforcing bounds.
    pub fn build(self) -> ErrorDetails {
        let logs = self.logs.filter(|l| !l.is_empty()).map(|mut logs| {
            if logs.len() > MAX_LOG_ENTRIES {
                logs.drain(..logs.len() - MAX_LOG_ENTRIES);
            }
            logs
        });
        let hint = self.hint.filter(|h| !h.trim().is_empty());

        ErrorDetails {
            message: self.message,
            stack: clamp_optional(self.stack),
            stderr: clamp_optional(self.stderr),
            stdout: clamp_optional(self.stdout),
            exit_code: self.exit_code,
            stage: self.stage,
            hint,
            logs,
        }
    }
}

impl From<ErrorDetailsBuilder> for ErrorDetails {
    fn from(builder: ErrorDetailsBuilder) -> Self {
        builder.build()
    }
}

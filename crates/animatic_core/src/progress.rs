//! Job progress updates.

use serde::{Deserialize, Serialize};

/// Coarse progress notification for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ProgressUpdate {
    progress: u8,
    step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ProgressUpdate {
    /// New update. Progress is capped at 100.
    pub fn new(progress: u8, step: impl Into<String>) -> Self {
        Self {
            progress: progress.min(100),
            step: step.into(),
            details: None,
        }
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

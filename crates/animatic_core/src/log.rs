//! Append-only render log for one attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity or stream of a log entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress information.
    #[display("info")]
    Info,
    /// Advisory warning; never blocks the render.
    #[display("warn")]
    Warn,
    /// Failure.
    #[display("error")]
    Error,
    /// Captured command stdout.
    #[display("stdout")]
    Stdout,
    /// Captured command stderr.
    #[display("stderr")]
    Stderr,
}

/// One entry in a [`RenderLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RenderLogEntry {
    timestamp: DateTime<Utc>,
    level: LogLevel,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

impl RenderLogEntry {
    /// Entry stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context: None,
        }
    }

    /// Attach structured context.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Ordered log accumulated over a single render attempt.
///
/// Returned to the caller on both success and failure. Warnings and errors
/// are mirrored to `tracing` as they are recorded.
#[derive(Debug, Clone, Default)]
pub struct RenderLog {
    entries: Vec<RenderLogEntry>,
}

impl RenderLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, entry: RenderLogEntry) {
        self.entries.push(entry);
    }

    /// Record progress information.
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%message, "render log");
        self.push(RenderLogEntry::new(LogLevel::Info, message));
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "render warning");
        self.push(RenderLogEntry::new(LogLevel::Warn, message));
    }

    /// Record an error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(%message, "render error");
        self.push(RenderLogEntry::new(LogLevel::Error, message));
    }

    /// Record captured stdout.
    pub fn stdout(&mut self, output: impl Into<String>) {
        self.push(RenderLogEntry::new(LogLevel::Stdout, output));
    }

    /// Record captured stderr.
    pub fn stderr(&mut self, output: impl Into<String>) {
        self.push(RenderLogEntry::new(LogLevel::Stderr, output));
    }

    /// Record both streams of a command, skipping empty ones.
    pub fn record_output(&mut self, command: &str, stdout: &str, stderr: &str) {
        let context = serde_json::json!({ "command": command });
        if !stdout.trim().is_empty() {
            self.push(
                RenderLogEntry::new(LogLevel::Stdout, stdout.trim_end()).with_context(context.clone()),
            );
        }
        if !stderr.trim().is_empty() {
            self.push(RenderLogEntry::new(LogLevel::Stderr, stderr.trim_end()).with_context(context));
        }
    }

    /// All entries in order.
    pub fn entries(&self) -> &[RenderLogEntry] {
        &self.entries
    }

    /// The last `n` entries.
    pub fn tail(&self, n: usize) -> Vec<RenderLogEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].to_vec()
    }

    /// Messages of all warning entries.
    pub fn warnings(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.level == LogLevel::Warn)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into the entry list.
    pub fn into_entries(self) -> Vec<RenderLogEntry> {
        self.entries
    }
}

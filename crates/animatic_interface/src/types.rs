//! Request and response types exchanged with collaborators.

use animatic_core::{AttemptRecord, ErrorDetails, RenderLogEntry, Script};
use animatic_error::StageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What the generator needs to write the first script for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    /// Job identifier
    pub job_id: String,
    /// Owner of the job
    pub owner_id: String,
    /// Approved narration prompt
    pub prompt: String,
    /// Optional topic hint
    pub topic: Option<String>,
}

/// Ask the generator to repair a script that failed heuristic checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRequest {
    /// Original prompt
    pub prompt: String,
    /// Script that failed
    pub previous_script: Script,
    /// Heuristic failure message
    pub error: String,
    /// Fix loop attempt, starting at 1
    pub attempt_number: u32,
}

/// Ask the generator for a new script after a failed render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationRequest {
    /// Original prompt
    pub prompt: String,
    /// Script whose render failed
    pub previous_script: Script,
    /// Message of the failure
    pub error_message: String,
    /// Full structured failure
    pub error_details: ErrorDetails,
    /// Render attempt that failed, starting at 1
    pub attempt_number: u32,
    /// Windowed history of failed attempts, oldest first
    pub attempt_history: Vec<AttemptRecord>,
    /// Scripts that must not be produced again
    pub blocked_scripts: Vec<Script>,
}

/// Result of the static heuristic checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicReport {
    /// Whether all rules passed
    pub ok: bool,
    /// First failure message
    pub error: Option<String>,
}

impl HeuristicReport {
    /// Passing report.
    pub fn passed() -> Self {
        Self { ok: true, error: None }
    }

    /// Failing report.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }

    /// Failure message, or a generic one when the checker gave none.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "Heuristic validation failed".to_string())
    }
}

/// Result of the deterministic auto-fixer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFixReport {
    /// Whether the script is clean after fixing
    pub ok: bool,
    /// Rewritten script
    pub script: Script,
    /// Descriptions of applied fixes
    pub applied_fixes: Vec<String>,
    /// Issues the fixer could not resolve
    pub unfixable_reasons: Vec<String>,
}

impl AutoFixReport {
    /// Whether the fix loop needs to run.
    pub fn has_unresolved_issues(&self) -> bool {
        !self.ok || !self.unfixable_reasons.is_empty()
    }
}

/// A command to run inside a sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxCommand {
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory relative to the sandbox root
    pub cwd: Option<String>,
    /// Time limit; the sandbox default applies when absent
    pub timeout: Option<Duration>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl SandboxCommand {
    /// Command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
            env: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the time limit.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a sandbox command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code; `None` when killed by a signal
    pub exit_code: Option<i32>,
    /// Wall time
    pub duration_ms: u64,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSuccess {
    /// Local path of the finished video
    pub video_path: PathBuf,
    /// Advisory warnings raised during the render
    pub warnings: Vec<String>,
    /// Full render log
    pub logs: Vec<RenderLogEntry>,
    /// Sandbox session that produced the video
    pub session_id: String,
    /// Probed duration of the final video
    pub duration_secs: f64,
    /// Probed width
    pub width: u32,
    /// Probed height
    pub height: u32,
}

/// A failed render, classified at the pipeline boundary.
#[derive(Debug, Clone)]
pub struct RenderFailure {
    /// Stage failure with clamped details
    pub error: StageError,
    /// Full render log
    pub logs: Vec<RenderLogEntry>,
    /// Sandbox session, when one was created
    pub session_id: Option<String>,
}

impl RenderFailure {
    /// Session id, or a placeholder when the sandbox never came up.
    pub fn session_label(&self) -> String {
        self.session_id
            .clone()
            .unwrap_or_else(|| "no-session".to_string())
    }
}

/// Title, description and tags for a finished video.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Tags
    pub tags: Vec<String>,
}

/// Input for post-render metadata generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRequest {
    /// Job identifier
    pub job_id: String,
    /// Original prompt
    pub prompt: String,
    /// Script that rendered
    pub script: Script,
    /// Uploaded video location
    pub video_url: String,
}

/// Terminal state persisted for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalState {
    /// Video is ready
    Completed {
        /// Uploaded video location
        video_url: String,
        /// Generated metadata
        metadata: VideoMetadata,
    },
    /// Job failed; message is user-facing
    Failed {
        /// Generic failure message
        message: String,
    },
}

/// Handoff to the downstream publishing workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPayload {
    /// Job identifier
    pub job_id: String,
    /// Owner of the job
    pub owner_id: String,
    /// Uploaded video location
    pub video_url: String,
    /// Generated metadata
    pub metadata: VideoMetadata,
    /// Render attempts the job needed
    pub render_attempts: u32,
}

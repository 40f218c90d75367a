//! Collaborator traits.

use crate::{
    AutoFixReport, CommandOutput, FinalState, GenerationContext, HeuristicReport, MetadataRequest,
    PublishPayload, RegenerationRequest, RenderFailure, RenderSuccess, RepairRequest,
    SandboxCommand, VideoMetadata,
};
use animatic_core::{ProgressUpdate, RenderOptions, Script};
use animatic_error::{AnimaticResult, SandboxError};
use async_trait::async_trait;
use std::path::Path;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// LLM-backed script author.
///
/// Repair and regeneration may return an empty script to signal that no fix
/// was produced. Callers treat that as distinct from an error.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Write the first script for a job. Not retried.
    async fn generate_script(&self, context: &GenerationContext) -> AnimaticResult<Script>;

    /// Repair a script that failed heuristic checks.
    async fn repair_script(&self, request: &RepairRequest) -> AnimaticResult<Script>;

    /// Produce a new script after a failed render.
    async fn regenerate_after_render_failure(
        &self,
        request: &RegenerationRequest,
    ) -> AnimaticResult<Script>;
}

/// Static, side-effect-free script validation.
pub trait ScriptValidator: Send + Sync {
    /// Run rule-based checks without executing the script.
    fn run_heuristic_checks(&self, script: &Script) -> HeuristicReport;

    /// Deterministically rewrite known-fixable issues.
    fn run_auto_fix(&self, script: &Script) -> AutoFixReport;
}

/// An exclusively leased execution context for one render attempt.
///
/// Paths are relative to the sandbox root.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Session identifier.
    fn id(&self) -> &str;

    /// Run a command to completion, capturing output.
    ///
    /// A non-zero exit is a normal result; errors mean the command could not
    /// run at all or timed out.
    async fn run(&self, command: &SandboxCommand) -> SandboxResult<CommandOutput>;

    /// Write a file, creating parent directories.
    async fn write_file(&self, path: &str, contents: &[u8]) -> SandboxResult<()>;

    /// Read a file.
    async fn read_file(&self, path: &str) -> SandboxResult<Vec<u8>>;

    /// Whether a file exists.
    async fn file_exists(&self, path: &str) -> SandboxResult<bool>;

    /// All files below a directory, recursively, as sandbox-relative paths.
    async fn list_files(&self, dir: &str) -> SandboxResult<Vec<String>>;

    /// Tear the sandbox down.
    async fn destroy(&self) -> SandboxResult<()>;
}

/// Source of fresh sandboxes.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Lease a new sandbox.
    async fn create_sandbox(&self) -> SandboxResult<Box<dyn Sandbox>>;
}

/// Receives coarse progress at each render stage transition.
pub trait StageProgressSink: Send + Sync {
    /// Called once per stage with a percentage of the render and a short label.
    fn on_stage(&self, progress: u8, label: &str);
}

/// One render attempt from script to local video file.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render a script once. Never retries internally.
    async fn render_once(
        &self,
        script: &Script,
        options: &RenderOptions,
        progress: Option<&dyn StageProgressSink>,
    ) -> Result<RenderSuccess, RenderFailure>;
}

/// Uploads finished videos.
#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Upload a video and return its URL.
    async fn upload_artifact(&self, video_path: &Path, owner_id: &str) -> AnimaticResult<String>;
}

/// Best-effort job progress sink.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Report progress. Failures are logged by the caller and ignored.
    async fn report_progress(&self, job_id: &str, update: ProgressUpdate) -> AnimaticResult<()>;
}

/// Post-render title, description and tags.
#[async_trait]
pub trait MetadataGenerator: Send + Sync {
    /// Generate metadata for a rendered video.
    async fn generate_metadata(&self, request: &MetadataRequest) -> AnimaticResult<VideoMetadata>;
}

/// Persistent job status.
#[async_trait]
pub trait JobStateStore: Send + Sync {
    /// Record the terminal state of a job.
    async fn persist_final_state(&self, job_id: &str, state: &FinalState) -> AnimaticResult<()>;
}

/// Downstream publishing workflow.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Start publishing for a finished job.
    async fn trigger_downstream(&self, payload: &PublishPayload) -> AnimaticResult<()>;
}

//! Bounded-retry generation and render loops for animatic.
//!
//! A job moves through two nested loops. The [`ScriptFixLoop`] repairs a
//! generated script until it passes the static heuristic checks, stopping
//! early when a repair repeats an earlier script. The [`RenderAttemptLoop`]
//! renders the script and, on failure, hands the structured error back to
//! the generator for a new candidate, keeping a windowed history of failed
//! attempts and a growing set of blocked scripts.
//!
//! [`GenerationOrchestrator`] runs both loops as a sequence of
//! [`Checkpoints`], reports progress through a [`ProgressNotifier`], then
//! generates metadata and finalizes the job.
//!
//! Configuration is loaded by [`PipelineConfig::load`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attempt_loop;
mod checkpoint;
mod config;
mod fix_loop;
mod notifier;
mod orchestrator;

pub use attempt_loop::{AttemptLoopRequest, RenderAttemptLoop, RenderLoopOutcome};
pub use checkpoint::{CheckpointLog, Checkpoints, FileCheckpointLog, InMemoryCheckpointLog};
pub use config::{LoopConfig, MessagesConfig, OutputConfig, PipelineConfig, ProgressConfig};
pub use fix_loop::{ScriptFixLoop, ScriptFixOutcome};
pub use notifier::{ProgressMessage, ProgressNotifier, RenderProgressBridge};
pub use orchestrator::{
    GenerationOrchestrator, GenerationOrchestratorBuilder, JobOutcome, JobRequest,
    fallback_metadata,
};

//! Trait definitions for the collaborators the animatic pipeline drives.
//!
//! Script generation, static validation, sandboxes, rendering, uploads and
//! job state are all reached through the traits here, so the control loops
//! can be exercised with in-memory implementations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{
    ArtifactUploader, JobStateStore, MetadataGenerator, ProgressReporter, Renderer, Sandbox,
    SandboxProvider, SandboxResult, ScriptGenerator, ScriptValidator, StageProgressSink,
    WorkflowTrigger,
};
pub use types::{
    AutoFixReport, CommandOutput, FinalState, GenerationContext, HeuristicReport,
    MetadataRequest, PublishPayload, RegenerationRequest, RenderFailure, RenderSuccess,
    RepairRequest, SandboxCommand, VideoMetadata,
};

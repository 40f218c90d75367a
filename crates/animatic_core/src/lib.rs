//! Core data types for the animatic script-to-video pipeline.
//!
//! This crate provides the values that flow through every other animatic
//! crate: scripts and their fingerprints, the closed set of validation
//! stages, structured error details, render logs, attempt history and
//! render options.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attempt;
mod details;
mod fingerprint;
mod log;
mod options;
mod progress;
mod script;
mod stage;
mod telemetry;

pub use attempt::{AttemptHistory, AttemptRecord, BlockedScripts};
pub use details::{ErrorDetails, ErrorDetailsBuilder, MAX_LOG_ENTRIES, MAX_OUTPUT_CHARS, clamp_tail};
pub use fingerprint::{Fingerprint, fingerprint};
pub use log::{LogLevel, RenderLog, RenderLogEntry};
pub use options::{
    RenderOptions, RenderOptionsBuilder, RenderOptionsBuilderError, RenderQuality,
    WatermarkOptions, WatermarkPosition,
};
pub use progress::ProgressUpdate;
pub use script::Script;
pub use stage::ValidationStage;
pub use telemetry::{TelemetryGuard, TelemetryOptions, init_telemetry, stdout_tracer_provider};

//! Sandboxed, fail-fast render pipeline.
//!
//! [`RenderPipeline`] drives one script through a strictly sequential set of
//! stages inside a freshly leased sandbox: enhancement, syntax and safety
//! checks, plugin installation, LaTeX verification, rendering, output
//! location, ffprobe validation, optional speed change and watermark, and
//! download. The first failing stage ends the attempt with a
//! [`StageError`](animatic_error::StageError). Stages never retry; retrying
//! belongs to the caller.
//!
//! The sandbox is torn down exactly once per attempt by [`SandboxGuard`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ast_guard;
mod command;
mod config;
mod context;
mod enhance;
mod guard;
mod local;
mod locate;
mod pipeline;
mod plugins;
mod probe;
mod step;

pub use ast_guard::{AST_GUARD_PROGRAM, SCENE_CHECK_PROGRAM};
pub use command::{failure_message, run_stage_command};
pub use config::SandboxConfig;
pub use context::RenderContext;
pub use enhance::{
    EnhancedScript, SnippetHeader, enhance_script, find_scene_classes, inject_layout_preamble,
    parse_header, uses_latex,
};
pub use guard::SandboxGuard;
pub use local::{LocalSandbox, LocalSandboxProvider};
pub use locate::{candidate_paths, select_from_listing};
pub use pipeline::{RenderPipeline, SCENE_FILE};
pub use plugins::{PLUGINS, PluginSpec, detect_plugins};
pub use probe::{VideoProbe, check_dimensions, check_duration, parse_ffprobe_json};
pub use step::{RenderRun, RenderStep};

//! Sandbox and toolchain settings.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where sandboxes live and which tools they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct SandboxConfig {
    /// Parent directory for local sandbox sessions
    work_root: PathBuf,
    /// Limit for check commands
    command_timeout_secs: u64,
    /// Limit for rendering and encoding commands
    render_timeout_secs: u64,
    /// Python interpreter
    python: String,
    /// Animation renderer
    manim: String,
    /// Encoder used for speed changes and watermarks
    ffmpeg: String,
    /// Prober used for video validation
    ffprobe: String,
    /// LaTeX binary checked before LaTeX scripts render
    latex: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("animatic"),
            command_timeout_secs: 120,
            render_timeout_secs: 900,
            python: "python3".to_string(),
            manim: "manim".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            latex: "latex".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Same settings with a different work root.
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = work_root.into();
        self
    }

    /// Limit for check commands.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.max(1))
    }

    /// Limit for rendering and encoding.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs.max(1))
    }
}

//! Validation stage tags.

use serde::{Deserialize, Serialize};

/// Closed, ordered set of stages a script passes through on its way to video.
///
/// Stages are tags on errors and log entries, never mutable state. The
/// declaration order is the pipeline order, so `Ord` compares by position.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationStage {
    /// Script input checks and sandbox preparation.
    #[display("input")]
    Input,
    /// Static heuristic rules.
    #[display("heuristic")]
    Heuristic,
    /// Python syntax compilation.
    #[display("syntax")]
    Syntax,
    /// AST guard against dangerous imports and calls.
    #[display("ast-guard")]
    AstGuard,
    /// Scene class structure checks.
    #[display("scene-validation")]
    SceneValidation,
    /// Plugin signature detection.
    #[display("plugin-detection")]
    PluginDetection,
    /// Plugin package installation.
    #[display("plugin-installation")]
    PluginInstallation,
    /// Post-install plugin import check.
    #[display("plugin-validation")]
    PluginValidation,
    /// Layout helper injection.
    #[display("layout-injection")]
    LayoutInjection,
    /// LaTeX toolchain check.
    #[display("latex")]
    Latex,
    /// Animation rendering.
    #[display("render")]
    Render,
    /// Rendered video checks (duration, dimensions).
    #[display("video-validation")]
    VideoValidation,
    /// Watermark overlay.
    #[display("watermark")]
    Watermark,
    /// Watermarked video checks.
    #[display("watermark-validation")]
    WatermarkValidation,
    /// Artifact retrieval from the sandbox.
    #[display("download")]
    Download,
}

impl ValidationStage {
    /// Stable tag used in logs and serialized error details.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Heuristic => "heuristic",
            Self::Syntax => "syntax",
            Self::AstGuard => "ast-guard",
            Self::SceneValidation => "scene-validation",
            Self::PluginDetection => "plugin-detection",
            Self::PluginInstallation => "plugin-installation",
            Self::PluginValidation => "plugin-validation",
            Self::LayoutInjection => "layout-injection",
            Self::Latex => "latex",
            Self::Render => "render",
            Self::VideoValidation => "video-validation",
            Self::Watermark => "watermark",
            Self::WatermarkValidation => "watermark-validation",
            Self::Download => "download",
        }
    }

    /// Human hint attached to errors raised at this stage.
    pub fn default_hint(&self) -> &'static str {
        match self {
            Self::Input => "The script was empty or the sandbox could not be prepared.",
            Self::Heuristic => "The script violates a static rule; rewrite the offending construct.",
            Self::Syntax => "The script is not valid Python; fix the syntax error reported in stderr.",
            Self::AstGuard => "Remove disallowed imports or calls (subprocess, eval, exec, file or network access).",
            Self::SceneValidation => "Define exactly one Scene subclass with a construct(self) method.",
            Self::PluginDetection | Self::PluginInstallation | Self::PluginValidation => {
                "Avoid optional plugins or use only core animation objects."
            }
            Self::LayoutInjection => "The layout helpers could not be merged into the script.",
            Self::Latex => "LaTeX is unavailable; replace Tex/MathTex objects with Text.",
            Self::Render => "The animation raised an error while rendering; check the traceback in stderr.",
            Self::VideoValidation => "The rendered video was empty, too long, or had unexpected dimensions.",
            Self::Watermark => "Watermarking failed; the rendered video may be corrupt.",
            Self::WatermarkValidation => "The watermarked video does not match the rendered video.",
            Self::Download => "The rendered video could not be retrieved from the sandbox.",
        }
    }
}

impl std::str::FromStr for ValidationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use strum::IntoEnumIterator;

        Self::iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("Unknown validation stage: {}", s))
    }
}

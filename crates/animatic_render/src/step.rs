//! Pipeline steps and the per-attempt run state.

use animatic_core::{ErrorDetailsBuilder, MAX_LOG_ENTRIES, RenderLog, ValidationStage};
use animatic_error::StageError;
use animatic_interface::StageProgressSink;

/// One step of the render state machine, in execution order.
///
/// Several steps share a [`ValidationStage`] tag; the tag classifies errors,
/// the step drives progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::EnumIter)]
pub enum RenderStep {
    /// Lease a sandbox.
    SandboxCreate,
    /// Wrap snippets, ensure imports, inject layout helpers.
    ScriptEnhancement,
    /// Write the scene file.
    Write,
    /// Compile the scene file.
    Syntax,
    /// Reject dangerous imports and calls.
    AstGuard,
    /// Check the Scene class structure.
    SceneValidation,
    /// Find plugin signatures.
    PluginDetection,
    /// Install detected plugins.
    PluginInstallation,
    /// Verify the LaTeX toolchain.
    Latex,
    /// Render the animation.
    Render,
    /// Find the rendered file.
    LocateOutput,
    /// Probe and bound the duration.
    DurationCheck,
    /// Probe and match the frame size.
    DimensionCheck,
    /// Change playback speed.
    SpeedAdjust,
    /// Burn in the watermark.
    Watermark,
    /// Compare watermarked and rendered video.
    WatermarkValidation,
    /// Copy the video out of the sandbox.
    Download,
}

impl RenderStep {
    /// Stage tag for errors raised during this step.
    pub fn stage(&self) -> ValidationStage {
        match self {
            Self::SandboxCreate | Self::Write => ValidationStage::Input,
            Self::ScriptEnhancement | Self::SceneValidation => ValidationStage::SceneValidation,
            Self::Syntax => ValidationStage::Syntax,
            Self::AstGuard => ValidationStage::AstGuard,
            Self::PluginDetection => ValidationStage::PluginDetection,
            Self::PluginInstallation => ValidationStage::PluginInstallation,
            Self::Latex => ValidationStage::Latex,
            Self::Render | Self::LocateOutput | Self::SpeedAdjust => ValidationStage::Render,
            Self::DurationCheck | Self::DimensionCheck => ValidationStage::VideoValidation,
            Self::Watermark => ValidationStage::Watermark,
            Self::WatermarkValidation => ValidationStage::WatermarkValidation,
            Self::Download => ValidationStage::Download,
        }
    }

    /// Coarse percentage of the render reached when this step starts.
    pub fn progress(&self) -> u8 {
        match self {
            Self::SandboxCreate => 5,
            Self::ScriptEnhancement => 10,
            Self::Write => 12,
            Self::Syntax => 15,
            Self::AstGuard => 20,
            Self::SceneValidation => 25,
            Self::PluginDetection => 30,
            Self::PluginInstallation => 35,
            Self::Latex => 40,
            Self::Render => 50,
            Self::LocateOutput => 75,
            Self::DurationCheck => 80,
            Self::DimensionCheck => 83,
            Self::SpeedAdjust => 86,
            Self::Watermark => 90,
            Self::WatermarkValidation => 94,
            Self::Download => 97,
        }
    }

    /// Short label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SandboxCreate => "Preparing sandbox",
            Self::ScriptEnhancement => "Preparing script",
            Self::Write => "Writing script",
            Self::Syntax => "Checking syntax",
            Self::AstGuard => "Checking script safety",
            Self::SceneValidation => "Validating scene",
            Self::PluginDetection => "Detecting plugins",
            Self::PluginInstallation => "Installing plugins",
            Self::Latex => "Checking LaTeX",
            Self::Render => "Rendering animation",
            Self::LocateOutput => "Locating video",
            Self::DurationCheck => "Validating duration",
            Self::DimensionCheck => "Validating dimensions",
            Self::SpeedAdjust => "Adjusting speed",
            Self::Watermark => "Applying watermark",
            Self::WatermarkValidation => "Validating watermark",
            Self::Download => "Downloading video",
        }
    }
}

/// Mutable state of one render attempt: the log and the progress sink.
pub struct RenderRun<'a> {
    log: RenderLog,
    sink: Option<&'a dyn StageProgressSink>,
    current: Option<RenderStep>,
}

impl<'a> RenderRun<'a> {
    /// New run reporting to `sink`.
    pub fn new(sink: Option<&'a dyn StageProgressSink>) -> Self {
        Self {
            log: RenderLog::new(),
            sink,
            current: None,
        }
    }

    /// Move to the next step, logging it and notifying the sink once.
    pub fn enter(&mut self, step: RenderStep) {
        if self.current == Some(step) {
            return;
        }
        self.current = Some(step);
        tracing::debug!(stage = %step.stage(), progress = step.progress(), "{}", step.label());
        self.log.info(step.label());
        if let Some(sink) = self.sink {
            sink.on_stage(step.progress(), step.label());
        }
    }

    /// Step in progress.
    pub fn current(&self) -> Option<RenderStep> {
        self.current
    }

    /// The log.
    pub fn log(&self) -> &RenderLog {
        &self.log
    }

    /// The log, for appending.
    pub fn log_mut(&mut self) -> &mut RenderLog {
        &mut self.log
    }

    /// Build a stage error, logging it and attaching the log tail.
    #[track_caller]
    pub fn fail(&mut self, stage: ValidationStage, details: ErrorDetailsBuilder) -> StageError {
        self.log
            .error(format!("[{}] {}", stage, details.current_message()));
        let logs = self.log.tail(MAX_LOG_ENTRIES);
        StageError::new(stage, details.logs(logs))
    }

    /// Build a stage error tagged with the current step's stage.
    #[track_caller]
    pub fn fail_current(&mut self, details: ErrorDetailsBuilder) -> StageError {
        let stage = self
            .current
            .map(|step| step.stage())
            .unwrap_or(ValidationStage::Input);
        self.fail(stage, details)
    }

    /// Consume into the log.
    pub fn into_log(self) -> RenderLog {
        self.log
    }
}

//! Single-render command handler.

use super::load_config;
use animatic::{
    LocalSandboxProvider, RenderContext, RenderOptions, RenderPipeline, RenderQuality, Renderer,
    Script, StageProgressSink, WatermarkOptions,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Overrides for one CLI render.
#[derive(Debug, Clone, Default)]
pub struct RenderArgs {
    /// Script or snippet to render
    pub script: PathBuf,
    /// Quality preset override
    pub quality: Option<RenderQuality>,
    /// Output directory override
    pub output_dir: Option<PathBuf>,
    /// Watermark text override
    pub watermark: Option<String>,
    /// Drop the configured watermark
    pub no_watermark: bool,
    /// Playback speed multiplier
    pub speed: Option<f64>,
}

impl RenderArgs {
    /// Apply the overrides to configured options.
    pub fn apply(&self, mut options: RenderOptions) -> RenderOptions {
        if let Some(quality) = self.quality {
            options = options.with_quality(quality);
        }
        if let Some(dir) = &self.output_dir {
            options = options.with_output_dir(dir.clone());
        }
        if self.no_watermark {
            options = options.with_watermark(None);
        } else if let Some(text) = &self.watermark {
            let base = options.watermark().clone().unwrap_or_default();
            options = options.with_watermark(Some(
                WatermarkOptions::new(text.clone()).with_position(*base.position()),
            ));
        }
        if let Some(speed) = self.speed {
            options = options.with_speed(speed);
        }
        options
    }
}

/// Logs render stage transitions to the console.
struct ConsoleProgress;

impl StageProgressSink for ConsoleProgress {
    fn on_stage(&self, progress: u8, label: &str) {
        info!(progress, stage = label, "Render progress");
    }
}

/// Render a script once with the local sandbox and report where the video landed.
pub async fn render_script(
    args: &RenderArgs,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let options = args.apply(config.render_options());
    let script = Script::new(tokio::fs::read_to_string(&args.script).await?);

    info!(
        script = %args.script.display(),
        quality = %options.quality(),
        fingerprint = %script.fingerprint().short(),
        "Rendering script"
    );

    let provider = Arc::new(LocalSandboxProvider::new(config.sandbox.clone()));
    let pipeline = RenderPipeline::new(provider, Arc::new(RenderContext::new()), config.sandbox);

    match pipeline.render_once(&script, &options, Some(&ConsoleProgress)).await {
        Ok(success) => {
            for warning in &success.warnings {
                warn!("{}", warning);
            }
            println!(
                "{} ({:.1}s, {}x{})",
                success.video_path.display(),
                success.duration_secs,
                success.width,
                success.height
            );
            Ok(())
        }
        Err(failure) => {
            let details = &failure.error.details;
            eprintln!("Render failed at {}: {}", failure.error.stage, details.message());
            if let Some(hint) = details.hint() {
                eprintln!("Hint: {}", hint);
            }
            if let Some(stderr) = details.stderr() {
                eprintln!("--- stderr ---\n{}", stderr);
            }
            Err(failure.error.into())
        }
    }
}

//! The render state machine.

use crate::{
    AST_GUARD_PROGRAM, RenderContext, RenderRun, RenderStep, SCENE_CHECK_PROGRAM, SandboxConfig,
    SandboxGuard, VideoProbe, candidate_paths, check_dimensions, check_duration, detect_plugins,
    enhance_script, inject_layout_preamble, parse_ffprobe_json, run_stage_command,
    select_from_listing, uses_latex,
};
use animatic_core::{ErrorDetails, RenderOptions, Script, ValidationStage};
use animatic_error::StageError;
use animatic_interface::{
    RenderFailure, RenderSuccess, Renderer, Sandbox, SandboxCommand, SandboxProvider,
    StageProgressSink,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Scene file written into every sandbox.
pub const SCENE_FILE: &str = "scene.py";

const SCENE_STEM: &str = "scene";
const MEDIA_DIR: &str = "media";
const AST_GUARD_FILE: &str = ".animatic/ast_guard.py";
const SCENE_CHECK_FILE: &str = ".animatic/scene_check.py";
const SPEED_FILE: &str = "output/speed.mp4";
const WATERMARK_FILE: &str = "output/watermarked.mp4";

/// Renders scripts in freshly leased sandboxes.
///
/// Stateless per call apart from the shared [`RenderContext`].
pub struct RenderPipeline {
    provider: Arc<dyn SandboxProvider>,
    context: Arc<RenderContext>,
    config: SandboxConfig,
}

/// What the stages produced before download.
struct RenderedVideo {
    sandbox_path: String,
    probe: VideoProbe,
}

impl RenderPipeline {
    /// Pipeline leasing sandboxes from `provider`.
    pub fn new(
        provider: Arc<dyn SandboxProvider>,
        context: Arc<RenderContext>,
        config: SandboxConfig,
    ) -> Self {
        Self {
            provider,
            context,
            config,
        }
    }

    /// Shared render context.
    pub fn context(&self) -> &Arc<RenderContext> {
        &self.context
    }

    fn check(&self, program: &str) -> SandboxCommand {
        SandboxCommand::new(program).timeout(self.config.command_timeout())
    }

    async fn run_stages(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        script: &Script,
        options: &RenderOptions,
    ) -> Result<(PathBuf, VideoProbe), StageError> {
        run.enter(RenderStep::ScriptEnhancement);
        let enhanced = enhance_script(script, options.scene_name().as_deref()).map_err(|msg| {
            let stage = if script.is_blank() {
                ValidationStage::Input
            } else {
                ValidationStage::SceneValidation
            };
            run.fail(stage, ErrorDetails::builder(msg))
        })?;
        if enhanced.wrapped {
            run.log_mut()
                .info(format!("Wrapped snippet in {}", enhanced.scene_name));
        }
        if !enhanced.header.is_empty() {
            tracing::debug!(
                schema = ?enhanced.header.schema,
                topics = ?enhanced.header.topics,
                "Snippet header"
            );
        }
        let source = inject_layout_preamble(&enhanced.source, options.layout_preamble().as_deref())
            .map_err(|msg| run.fail(ValidationStage::LayoutInjection, ErrorDetails::builder(msg)))?;

        run.enter(RenderStep::Write);
        self.write(sandbox, run, SCENE_FILE, source.as_bytes(), ValidationStage::Input)
            .await?;

        run.enter(RenderStep::Syntax);
        run_stage_command(
            sandbox,
            run,
            ValidationStage::Syntax,
            self.check(self.config.python()).args(["-m", "py_compile", SCENE_FILE]),
        )
        .await?;

        run.enter(RenderStep::AstGuard);
        self.write(sandbox, run, AST_GUARD_FILE, AST_GUARD_PROGRAM.as_bytes(), ValidationStage::AstGuard)
            .await?;
        run_stage_command(
            sandbox,
            run,
            ValidationStage::AstGuard,
            self.check(self.config.python()).args([AST_GUARD_FILE, SCENE_FILE]),
        )
        .await?;

        run.enter(RenderStep::SceneValidation);
        self.write(
            sandbox,
            run,
            SCENE_CHECK_FILE,
            SCENE_CHECK_PROGRAM.as_bytes(),
            ValidationStage::SceneValidation,
        )
        .await?;
        run_stage_command(
            sandbox,
            run,
            ValidationStage::SceneValidation,
            self.check(self.config.python())
                .args([SCENE_CHECK_FILE, SCENE_FILE])
                .arg(enhanced.scene_name.as_str()),
        )
        .await?;

        self.install_plugins(sandbox, run, &source).await;

        run.enter(RenderStep::Latex);
        if uses_latex(&source) {
            if self.context.latex_verified() {
                run.log_mut().info("LaTeX already verified");
            } else {
                run_stage_command(
                    sandbox,
                    run,
                    ValidationStage::Latex,
                    self.check(self.config.latex()).arg("--version"),
                )
                .await?;
                self.context.mark_latex_verified();
            }
        }

        run.enter(RenderStep::Render);
        let (width, height, fps) = options.resolution();
        let render = SandboxCommand::new(self.config.manim())
            .arg(options.quality().flag())
            .args(["-r".to_string(), format!("{},{}", width, height)])
            .args(["--fps".to_string(), fps.to_string()])
            .args(["--media_dir", MEDIA_DIR, "--disable_caching", SCENE_FILE])
            .arg(enhanced.scene_name.as_str())
            .timeout(self.config.render_timeout());
        run_stage_command(sandbox, run, ValidationStage::Render, render).await?;

        run.enter(RenderStep::LocateOutput);
        let rendered = self
            .locate_output(sandbox, run, &enhanced.scene_name, options)
            .await?;

        run.enter(RenderStep::DurationCheck);
        let probe = self
            .probe(sandbox, run, &rendered, ValidationStage::VideoValidation)
            .await?;
        check_duration(
            probe.duration_secs,
            *options.min_duration_secs(),
            *options.max_duration_secs(),
        )
        .map_err(|msg| run.fail(ValidationStage::VideoValidation, ErrorDetails::builder(msg)))?;

        run.enter(RenderStep::DimensionCheck);
        check_dimensions(&probe, width, height)
            .map_err(|msg| run.fail(ValidationStage::VideoValidation, ErrorDetails::builder(msg)))?;

        let mut current = RenderedVideo {
            sandbox_path: rendered,
            probe,
        };

        if let Some(speed) = options.speed_factor() {
            run.enter(RenderStep::SpeedAdjust);
            current = self.adjust_speed(sandbox, run, current, speed, options).await?;
        }

        if let Some(watermark) = options.watermark() {
            run.enter(RenderStep::Watermark);
            let command = SandboxCommand::new(self.config.ffmpeg())
                .args(["-y", "-i", current.sandbox_path.as_str(), "-vf"])
                .arg(watermark.drawtext_filter())
                .args(["-codec:a", "copy", WATERMARK_FILE])
                .timeout(self.config.render_timeout());
            self.ensure_output_dir(sandbox, run, ValidationStage::Watermark)
                .await?;
            run_stage_command(sandbox, run, ValidationStage::Watermark, command).await?;

            run.enter(RenderStep::WatermarkValidation);
            let marked = self
                .probe(sandbox, run, WATERMARK_FILE, ValidationStage::WatermarkValidation)
                .await?;
            let drift = (marked.duration_secs - current.probe.duration_secs).abs();
            if marked.width != current.probe.width
                || marked.height != current.probe.height
                || drift > *options.duration_tolerance_secs()
            {
                return Err(run.fail(
                    ValidationStage::WatermarkValidation,
                    ErrorDetails::builder(format!(
                        "Watermarked video is {}x{} {:.2}s, rendered video is {}x{} {:.2}s",
                        marked.width,
                        marked.height,
                        marked.duration_secs,
                        current.probe.width,
                        current.probe.height,
                        current.probe.duration_secs
                    )),
                ));
            }
            current = RenderedVideo {
                sandbox_path: WATERMARK_FILE.to_string(),
                probe: marked,
            };
        }

        run.enter(RenderStep::Download);
        let local = self
            .download(sandbox, run, &current.sandbox_path, options)
            .await?;
        Ok((local, current.probe))
    }

    async fn write(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        path: &str,
        contents: &[u8],
        stage: ValidationStage,
    ) -> Result<(), StageError> {
        sandbox.write_file(path, contents).await.map_err(|e| {
            run.fail(
                stage,
                ErrorDetails::builder(format!("Failed to write {}: {}", path, e.kind)),
            )
        })
    }

    async fn ensure_output_dir(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        stage: ValidationStage,
    ) -> Result<(), StageError> {
        self.write(sandbox, run, "output/.keep", b"", stage).await
    }

    /// Install plugins whose signatures appear in the script.
    ///
    /// Failures are warnings: the script may not need the plugin at runtime.
    async fn install_plugins(&self, sandbox: &dyn Sandbox, run: &mut RenderRun<'_>, source: &str) {
        run.enter(RenderStep::PluginDetection);
        let plugins = detect_plugins(source);
        if plugins.is_empty() {
            return;
        }
        run.log_mut().info(format!(
            "Detected plugins: {}",
            plugins.iter().map(|p| p.name).collect::<Vec<_>>().join(", ")
        ));

        run.enter(RenderStep::PluginInstallation);
        for plugin in plugins {
            if self.context.is_plugin_installed(sandbox.id(), plugin.name) {
                run.log_mut()
                    .info(format!("Plugin {} already installed", plugin.name));
                continue;
            }

            let install = self
                .check(self.config.python())
                .args(["-m", "pip", "install", "--quiet", plugin.package])
                .timeout(self.config.render_timeout());
            let display = install.display();
            match sandbox.run(&install).await {
                Ok(output) if output.success() => {
                    run.log_mut()
                        .record_output(&display, &output.stdout, &output.stderr);
                    self.context
                        .record_plugin_installed(sandbox.id(), plugin.name);
                }
                Ok(output) => {
                    run.log_mut()
                        .record_output(&display, &output.stdout, &output.stderr);
                    run.log_mut().warn(format!(
                        "[{}] Plugin {} failed to install: {}",
                        ValidationStage::PluginInstallation,
                        plugin.name,
                        crate::failure_message(&display, &output)
                    ));
                    continue;
                }
                Err(e) => {
                    run.log_mut().warn(format!(
                        "[{}] Plugin {} could not be installed: {}",
                        ValidationStage::PluginInstallation,
                        plugin.name,
                        e.kind
                    ));
                    continue;
                }
            }

            let import = self
                .check(self.config.python())
                .arg("-c")
                .arg(format!("import {}", plugin.module));
            match sandbox.run(&import).await {
                Ok(output) if output.success() => {}
                Ok(output) => run.log_mut().warn(format!(
                    "[{}] Plugin {} installed but failed to import: {}",
                    ValidationStage::PluginValidation,
                    plugin.name,
                    crate::failure_message(&import.display(), &output)
                )),
                Err(e) => run.log_mut().warn(format!(
                    "[{}] Plugin {} import check failed: {}",
                    ValidationStage::PluginValidation,
                    plugin.name,
                    e.kind
                )),
            }
        }
    }

    async fn locate_output(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        scene_name: &str,
        options: &RenderOptions,
    ) -> Result<String, StageError> {
        for candidate in candidate_paths(MEDIA_DIR, SCENE_STEM, scene_name, options) {
            match sandbox.file_exists(&candidate).await {
                Ok(true) => {
                    run.log_mut().info(format!("Found video at {}", candidate));
                    return Ok(candidate);
                }
                Ok(false) => {}
                Err(e) => tracing::debug!(path = %candidate, error = %e, "Candidate check failed"),
            }
        }

        let files = sandbox.list_files(MEDIA_DIR).await.map_err(|e| {
            run.fail(
                ValidationStage::Render,
                ErrorDetails::builder(format!("Could not list render output: {}", e.kind)),
            )
        })?;
        match select_from_listing(&files, scene_name) {
            Some(path) => {
                run.log_mut()
                    .info(format!("Found video by directory walk at {}", path));
                Ok(path)
            }
            None => Err(run.fail(
                ValidationStage::Render,
                ErrorDetails::builder(format!(
                    "Rendered video for {} not found ({} files under {})",
                    scene_name,
                    files.len(),
                    MEDIA_DIR
                )),
            )),
        }
    }

    async fn probe(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        path: &str,
        stage: ValidationStage,
    ) -> Result<VideoProbe, StageError> {
        let command = self
            .check(self.config.ffprobe())
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
                path,
            ]);
        let output = run_stage_command(sandbox, run, stage, command).await?;
        parse_ffprobe_json(&output.stdout).map_err(|msg| {
            run.fail(
                stage,
                ErrorDetails::builder(msg).stdout(output.stdout.clone()),
            )
        })
    }

    async fn adjust_speed(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        input: RenderedVideo,
        speed: f64,
        options: &RenderOptions,
    ) -> Result<RenderedVideo, StageError> {
        self.ensure_output_dir(sandbox, run, ValidationStage::Render)
            .await?;
        let mut command = SandboxCommand::new(self.config.ffmpeg())
            .args(["-y", "-i", input.sandbox_path.as_str(), "-filter:v"])
            .arg(format!("setpts=PTS/{}", speed));
        command = match atempo_chain(speed) {
            Some(filter) => command.args(["-filter:a".to_string(), filter]),
            None => command.arg("-an"),
        };
        let command = command.arg(SPEED_FILE).timeout(self.config.render_timeout());
        run_stage_command(sandbox, run, ValidationStage::Render, command).await?;

        let probe = self
            .probe(sandbox, run, SPEED_FILE, ValidationStage::VideoValidation)
            .await?;
        let expected = input.probe.duration_secs / speed;
        if (probe.duration_secs - expected).abs() > *options.duration_tolerance_secs() {
            return Err(run.fail(
                ValidationStage::VideoValidation,
                ErrorDetails::builder(format!(
                    "Speed-adjusted video is {:.2}s, expected {:.2}s",
                    probe.duration_secs, expected
                )),
            ));
        }
        check_duration(
            probe.duration_secs,
            *options.min_duration_secs(),
            *options.max_duration_secs(),
        )
        .map_err(|msg| run.fail(ValidationStage::VideoValidation, ErrorDetails::builder(msg)))?;

        Ok(RenderedVideo {
            sandbox_path: SPEED_FILE.to_string(),
            probe,
        })
    }

    async fn download(
        &self,
        sandbox: &dyn Sandbox,
        run: &mut RenderRun<'_>,
        path: &str,
        options: &RenderOptions,
    ) -> Result<PathBuf, StageError> {
        let bytes = sandbox.read_file(path).await.map_err(|e| {
            run.fail(
                ValidationStage::Download,
                ErrorDetails::builder(format!("Failed to read {}: {}", path, e.kind)),
            )
        })?;
        if bytes.is_empty() {
            return Err(run.fail(
                ValidationStage::Download,
                ErrorDetails::builder(format!("{} is empty", path)),
            ));
        }

        let dir = options.output_dir();
        let target = dir.join(format!("{}.mp4", sandbox.id()));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&target, &bytes).await
        }
        .await;
        written.map_err(|e| {
            run.fail(
                ValidationStage::Download,
                ErrorDetails::builder(format!("Failed to save {}: {}", target.display(), e)),
            )
        })?;
        run.log_mut().info(format!(
            "Saved {} bytes to {}",
            bytes.len(),
            target.display()
        ));
        Ok(target)
    }
}

/// Audio tempo filter for a speed factor; `atempo` accepts 0.5..=2.0 per stage.
fn atempo_chain(speed: f64) -> Option<String> {
    if !speed.is_finite() || speed <= 0.0 {
        return None;
    }
    let mut remaining = speed;
    let mut stages = Vec::new();
    while remaining > 2.0 {
        stages.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push("atempo=0.5".to_string());
        remaining /= 0.5;
    }
    stages.push(format!("atempo={}", remaining));
    Some(stages.join(","))
}

#[async_trait]
impl Renderer for RenderPipeline {
    #[tracing::instrument(skip_all, fields(script_lines = script.line_count(), quality = %options.quality()))]
    async fn render_once(
        &self,
        script: &Script,
        options: &RenderOptions,
        progress: Option<&dyn StageProgressSink>,
    ) -> Result<RenderSuccess, RenderFailure> {
        let mut run = RenderRun::new(progress);

        run.enter(RenderStep::SandboxCreate);
        let sandbox = match self.provider.create_sandbox().await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                let error = run.fail(
                    ValidationStage::Input,
                    ErrorDetails::builder(format!("Failed to create sandbox: {}", e.kind)),
                );
                return Err(RenderFailure {
                    error,
                    logs: run.into_log().into_entries(),
                    session_id: None,
                });
            }
        };

        let guard = SandboxGuard::new(sandbox, Arc::clone(&self.context));
        let session_id = guard.id().to_string();
        tracing::info!(session_id = %session_id, "Render attempt started");

        let outcome = self
            .run_stages(guard.sandbox(), &mut run, script, options)
            .await;
        guard.cleanup().await;

        match outcome {
            Ok((video_path, probe)) => {
                tracing::info!(
                    session_id = %session_id,
                    duration_secs = probe.duration_secs,
                    "Render attempt succeeded"
                );
                let log = run.into_log();
                Ok(RenderSuccess {
                    video_path,
                    warnings: log.warnings(),
                    logs: log.into_entries(),
                    session_id,
                    duration_secs: probe.duration_secs,
                    width: probe.width,
                    height: probe.height,
                })
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %session_id,
                    stage = %error.stage,
                    message = %error.message(),
                    "Render attempt failed"
                );
                Err(RenderFailure {
                    error,
                    logs: run.into_log().into_entries(),
                    session_id: Some(session_id),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atempo_splits_large_factors() {
        assert_eq!(atempo_chain(1.5).as_deref(), Some("atempo=1.5"));
        assert_eq!(atempo_chain(3.0).as_deref(), Some("atempo=2.0,atempo=1.5"));
        assert_eq!(atempo_chain(0.25).as_deref(), Some("atempo=0.5,atempo=0.5"));
        assert_eq!(atempo_chain(0.0), None);
    }
}

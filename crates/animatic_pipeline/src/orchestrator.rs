//! End-to-end job orchestration.

use crate::{
    AttemptLoopRequest, CheckpointLog, Checkpoints, InMemoryCheckpointLog, PipelineConfig,
    ProgressNotifier, RenderAttemptLoop, ScriptFixLoop,
};
use animatic_core::{AttemptRecord, Script};
use animatic_error::{AnimaticError, AnimaticResult, ConfigError, JobError, JobErrorKind};
use animatic_interface::{
    ArtifactUploader, AutoFixReport, FinalState, GenerationContext, JobStateStore,
    MetadataGenerator, MetadataRequest, ProgressReporter, PublishPayload, Renderer,
    ScriptGenerator, ScriptValidator, VideoMetadata, WorkflowTrigger,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const MAX_FALLBACK_TITLE_CHARS: usize = 100;

/// A job to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Job identifier, also the checkpoint namespace
    pub job_id: String,
    /// Owner of the job
    pub owner_id: String,
    /// Approved narration prompt
    pub prompt: String,
    /// Optional topic hint for the generator
    pub topic: Option<String>,
}

impl JobRequest {
    /// Request with no topic.
    pub fn new(
        job_id: impl Into<String>,
        owner_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            owner_id: owner_id.into(),
            prompt: prompt.into(),
            topic: None,
        }
    }

    fn generation_context(&self) -> GenerationContext {
        GenerationContext {
            job_id: self.job_id.clone(),
            owner_id: self.owner_id.clone(),
            prompt: self.prompt.clone(),
            topic: self.topic.clone(),
        }
    }
}

/// A finished job.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct JobOutcome {
    /// Job identifier
    job_id: String,
    /// Uploaded video location
    video_url: String,
    /// Generated or fallback metadata
    metadata: VideoMetadata,
    /// Script that rendered
    script: Script,
    /// Repair requests made by the fix loop
    repair_calls: u32,
    /// Render attempts, including the successful one
    render_attempts: u32,
    /// Whether an earlier render attempt failed
    retried_after_error: bool,
    /// Windowed history of failed attempts
    failed_attempts: Vec<AttemptRecord>,
    /// Advisory warnings collected along the way
    warnings: Vec<String>,
}

/// Drives one job from prompt to published video.
///
/// Runs as a sequence of checkpoints: generate, auto-fix, fix loop, render
/// attempts (with uploads and regenerations), metadata, then the final
/// state and downstream trigger guarded by markers. Re-running a job with
/// the same checkpoint log skips everything already committed.
///
/// Only [`JobError`] escapes for loop decisions; stage detail never reaches
/// this level.
pub struct GenerationOrchestrator {
    generator: Arc<dyn ScriptGenerator>,
    validator: Arc<dyn ScriptValidator>,
    renderer: Arc<dyn Renderer>,
    uploader: Arc<dyn ArtifactUploader>,
    reporter: Arc<dyn ProgressReporter>,
    metadata: Arc<dyn MetadataGenerator>,
    store: Arc<dyn JobStateStore>,
    trigger: Arc<dyn WorkflowTrigger>,
    checkpoint_log: Arc<dyn CheckpointLog>,
    config: PipelineConfig,
}

impl GenerationOrchestrator {
    /// Start a builder.
    pub fn builder() -> GenerationOrchestratorBuilder {
        GenerationOrchestratorBuilder::default()
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Checkpoints for a job.
    pub fn checkpoints(&self, job_id: &str) -> Checkpoints {
        Checkpoints::new(Arc::clone(&self.checkpoint_log), job_id)
    }

    /// Run a job to completion.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`JobError`] when the script cannot be fixed,
    /// generation keeps failing, every render fails, the upload fails or the
    /// job cannot be finalized. Checkpoint storage errors pass through
    /// unchanged so the host can retry.
    #[instrument(skip(self, request), fields(job_id = %request.job_id, owner_id = %request.owner_id))]
    pub async fn run(&self, request: &JobRequest) -> AnimaticResult<JobOutcome> {
        let notifier = ProgressNotifier::spawn(Arc::clone(&self.reporter), request.job_id.clone());
        let checkpoints = self.checkpoints(&request.job_id);

        let result = self.execute(request, &checkpoints, &notifier).await;

        let failed_reports = notifier
            .shutdown(self.config.progress.drain_timeout())
            .await;
        if failed_reports > 0 {
            warn!(failed_reports, "Some progress reports could not be delivered");
        }

        match &result {
            Ok(outcome) => info!(
                render_attempts = outcome.render_attempts,
                repair_calls = outcome.repair_calls,
                "Job completed"
            ),
            Err(e) => warn!(error = %e, non_retryable = e.is_non_retryable(), "Job failed"),
        }
        result
    }

    async fn execute(
        &self,
        request: &JobRequest,
        checkpoints: &Checkpoints,
        notifier: &ProgressNotifier,
    ) -> AnimaticResult<JobOutcome> {
        let mut warnings = Vec::new();

        notifier.step(5, "Generating script");
        let script = checkpoints
            .run("generate-script", || self.generate(request))
            .await?;

        notifier.step(15, "Validating script");
        let auto_fix = checkpoints
            .run("auto-fix", || self.auto_fix(&script))
            .await?;

        notifier.step(20, "Fixing script");
        let fix_loop = ScriptFixLoop::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.validator),
            self.config.loops.max_script_fix_attempts,
        );
        let fixed = checkpoints
            .run("script-fix", || {
                fix_loop.run(
                    auto_fix.script.clone(),
                    auto_fix.has_unresolved_issues(),
                    &request.prompt,
                )
            })
            .await?;
        if let Some(error) = fixed.last_error() {
            warnings.push(format!("Script still fails heuristic checks: {}", error));
        }

        notifier.step(30, "Rendering video");
        let attempt_loop = RenderAttemptLoop::new(
            Arc::clone(&self.renderer),
            Arc::clone(&self.generator),
            Arc::clone(&self.validator),
            Arc::clone(&self.uploader),
            self.config.loops.clone(),
        );
        let bridge = notifier.stage_sink(30, 85);
        let attempt_request = AttemptLoopRequest {
            prompt: request.prompt.clone(),
            owner_id: request.owner_id.clone(),
            script: fixed.script().clone(),
            options: self.config.render_options(),
        };
        let rendered = attempt_loop
            .run(&attempt_request, checkpoints, Some(&bridge))
            .await?;
        warnings.extend(rendered.warnings().iter().cloned());

        notifier.step(88, "Generating metadata");
        let metadata = checkpoints
            .run("metadata", || {
                self.generate_metadata(request, rendered.script(), rendered.video_url())
            })
            .await?;

        notifier.step(95, "Finalizing");
        let state = FinalState::Completed {
            video_url: rendered.video_url().clone(),
            metadata: metadata.clone(),
        };
        checkpoints
            .once("final-state", || async {
                self.store
                    .persist_final_state(&request.job_id, &state)
                    .await
                    .map_err(|e| finalize_error("persist final state", e))
            })
            .await?;

        let payload = PublishPayload {
            job_id: request.job_id.clone(),
            owner_id: request.owner_id.clone(),
            video_url: rendered.video_url().clone(),
            metadata: metadata.clone(),
            render_attempts: *rendered.render_attempts(),
        };
        checkpoints
            .once("downstream-trigger", || async {
                self.trigger
                    .trigger_downstream(&payload)
                    .await
                    .map_err(|e| finalize_error("trigger downstream workflow", e))
            })
            .await?;

        notifier.step(100, "Complete");

        Ok(JobOutcome {
            job_id: request.job_id.clone(),
            video_url: rendered.video_url().clone(),
            metadata,
            script: rendered.script().clone(),
            repair_calls: *fixed.repair_calls(),
            render_attempts: *rendered.render_attempts(),
            retried_after_error: *rendered.retried_after_error(),
            failed_attempts: rendered.failed_attempts().clone(),
            warnings,
        })
    }

    /// Persist the generic failure status for a job.
    ///
    /// The hosting engine calls this once a job has failed for good. Stage
    /// output is never persisted here; it stays in the logs.
    #[instrument(skip(self, error))]
    pub async fn handle_failure(&self, job_id: &str, error: &AnimaticError) -> AnimaticResult<()> {
        warn!(error = %error, "Recording job failure");
        let state = FinalState::Failed {
            message: self.config.messages.generic_failure.clone(),
        };
        self.checkpoints(job_id)
            .once("failure-state", || async {
                self.store
                    .persist_final_state(job_id, &state)
                    .await
                    .map_err(|e| finalize_error("persist failure state", e))
            })
            .await?;
        Ok(())
    }

    async fn generate(&self, request: &JobRequest) -> AnimaticResult<Script> {
        let script = self
            .generator
            .generate_script(&request.generation_context())
            .await
            .map_err(|e| AnimaticError::from(JobError::new(JobErrorKind::GenerationFailed(e.to_string()))))?
            .trimmed();
        info!(
            lines = script.line_count(),
            fingerprint = %script.fingerprint().short(),
            "Generated script"
        );
        Ok(script)
    }

    async fn auto_fix(&self, script: &Script) -> AnimaticResult<AutoFixReport> {
        if script.is_blank() {
            return Err(JobError::new(JobErrorKind::UnfixableScript(
                "generated script is empty".to_string(),
            ))
            .into());
        }

        let report = self.validator.run_auto_fix(script);
        if report.script.is_blank() {
            return Err(JobError::new(JobErrorKind::UnfixableScript(
                "auto-fix produced an empty script".to_string(),
            ))
            .into());
        }

        info!(
            ok = report.ok,
            applied = report.applied_fixes.len(),
            unfixable = report.unfixable_reasons.len(),
            "Auto-fix pass complete"
        );
        Ok(report)
    }

    async fn generate_metadata(
        &self,
        request: &JobRequest,
        script: &Script,
        video_url: &str,
    ) -> AnimaticResult<VideoMetadata> {
        let metadata_request = MetadataRequest {
            job_id: request.job_id.clone(),
            prompt: request.prompt.clone(),
            script: script.clone(),
            video_url: video_url.to_string(),
        };
        match self.metadata.generate_metadata(&metadata_request).await {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                warn!(error = %e, "Metadata generation failed, using fallback title");
                Ok(fallback_metadata(&request.prompt))
            }
        }
    }
}

fn finalize_error(action: &str, e: AnimaticError) -> AnimaticError {
    JobError::new(JobErrorKind::FinalizeFailed(format!("{}: {}", action, e))).into()
}

/// Metadata derived from the prompt when the generator cannot help.
pub fn fallback_metadata(prompt: &str) -> VideoMetadata {
    let first_line = prompt
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Untitled video");
    VideoMetadata {
        title: first_line.chars().take(MAX_FALLBACK_TITLE_CHARS).collect(),
        description: prompt.trim().to_string(),
        tags: Vec::new(),
    }
}

/// Builder for [`GenerationOrchestrator`].
///
/// Every collaborator is required. The checkpoint log defaults to an
/// in-memory one and the configuration to the bundled defaults.
#[derive(Default)]
pub struct GenerationOrchestratorBuilder {
    generator: Option<Arc<dyn ScriptGenerator>>,
    validator: Option<Arc<dyn ScriptValidator>>,
    renderer: Option<Arc<dyn Renderer>>,
    uploader: Option<Arc<dyn ArtifactUploader>>,
    reporter: Option<Arc<dyn ProgressReporter>>,
    metadata: Option<Arc<dyn MetadataGenerator>>,
    store: Option<Arc<dyn JobStateStore>>,
    trigger: Option<Arc<dyn WorkflowTrigger>>,
    checkpoint_log: Option<Arc<dyn CheckpointLog>>,
    config: Option<PipelineConfig>,
}

impl GenerationOrchestratorBuilder {
    /// Script generator.
    pub fn generator(mut self, generator: Arc<dyn ScriptGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Heuristic checker and auto-fixer.
    pub fn validator(mut self, validator: Arc<dyn ScriptValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Render pipeline.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Artifact uploader.
    pub fn uploader(mut self, uploader: Arc<dyn ArtifactUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Progress reporter.
    pub fn reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Metadata generator.
    pub fn metadata(mut self, metadata: Arc<dyn MetadataGenerator>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Job state store.
    pub fn store(mut self, store: Arc<dyn JobStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Downstream workflow trigger.
    pub fn trigger(mut self, trigger: Arc<dyn WorkflowTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Checkpoint log.
    pub fn checkpoint_log(mut self, log: Arc<dyn CheckpointLog>) -> Self {
        self.checkpoint_log = Some(log);
        self
    }

    /// Configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first missing collaborator, or
    /// the validation error for an invalid configuration.
    pub fn build(self) -> AnimaticResult<GenerationOrchestrator> {
        fn require<T>(value: Option<T>, name: &str) -> AnimaticResult<T> {
            value.ok_or_else(|| ConfigError::new(format!("Orchestrator is missing a {}", name)).into())
        }

        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(GenerationOrchestrator {
            generator: require(self.generator, "script generator")?,
            validator: require(self.validator, "script validator")?,
            renderer: require(self.renderer, "renderer")?,
            uploader: require(self.uploader, "artifact uploader")?,
            reporter: require(self.reporter, "progress reporter")?,
            metadata: require(self.metadata, "metadata generator")?,
            store: require(self.store, "job state store")?,
            trigger: require(self.trigger, "workflow trigger")?,
            checkpoint_log: self
                .checkpoint_log
                .unwrap_or_else(|| Arc::new(InMemoryCheckpointLog::new())),
            config,
        })
    }
}

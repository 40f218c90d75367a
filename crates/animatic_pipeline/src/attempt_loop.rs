//! Bounded render attempts with regeneration between failures.

use crate::{Checkpoints, LoopConfig};
use animatic_core::{
    AttemptHistory, AttemptRecord, BlockedScripts, ErrorDetails, RenderOptions, Script,
};
use animatic_error::{
    AnimaticResult, GenerationError, GenerationErrorKind, JobError, JobErrorKind,
};
use animatic_interface::{
    ArtifactUploader, RegenerationRequest, Renderer, ScriptGenerator, ScriptValidator,
    StageProgressSink,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_retry2::{Retry, RetryError, strategy::FixedInterval};
use tracing::{debug, info, instrument, warn};

/// Input to the render attempt loop.
#[derive(Debug, Clone)]
pub struct AttemptLoopRequest {
    /// Original prompt, replayed to the generator
    pub prompt: String,
    /// Owner the video is uploaded for
    pub owner_id: String,
    /// Script for the first attempt
    pub script: Script,
    /// Options for every attempt
    pub options: RenderOptions,
}

/// Successful end of the render attempt loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct RenderLoopOutcome {
    /// Uploaded video location
    video_url: String,
    /// Local video file
    video_path: PathBuf,
    /// Script that rendered
    script: Script,
    /// Attempts made, including the successful one
    render_attempts: u32,
    /// Whether an earlier attempt failed
    retried_after_error: bool,
    /// Windowed history of failed attempts, oldest first
    failed_attempts: Vec<AttemptRecord>,
    /// Scripts rejected during the job, in the order they were blocked
    blocked_scripts: Vec<Script>,
    /// Advisory warnings from rendering and regeneration
    warnings: Vec<String>,
}

/// Committed result of one render attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum AttemptResult {
    Rendered {
        video_path: PathBuf,
        session_id: String,
        warnings: Vec<String>,
    },
    Failed {
        error: ErrorDetails,
        session_id: String,
    },
}

/// Render a script; on failure hand the structured error to the generator
/// for a new candidate; repeat within budget.
///
/// This loop is the only place that decides between retrying and giving up.
/// Attempt `n + 1` starts only after attempt `n` has returned, and the
/// renderer tears its sandbox down before returning.
pub struct RenderAttemptLoop {
    renderer: Arc<dyn Renderer>,
    generator: Arc<dyn ScriptGenerator>,
    validator: Arc<dyn ScriptValidator>,
    uploader: Arc<dyn ArtifactUploader>,
    loops: LoopConfig,
}

impl RenderAttemptLoop {
    /// Loop over the given collaborators.
    pub fn new(
        renderer: Arc<dyn Renderer>,
        generator: Arc<dyn ScriptGenerator>,
        validator: Arc<dyn ScriptValidator>,
        uploader: Arc<dyn ArtifactUploader>,
        loops: LoopConfig,
    ) -> Self {
        Self {
            renderer,
            generator,
            validator,
            uploader,
            loops,
        }
    }

    /// Render budget.
    pub fn max_attempts(&self) -> u32 {
        self.loops.max_render_attempts.max(1)
    }

    /// Run attempts until one renders and uploads, or the budget is spent.
    ///
    /// Each attempt, upload and regeneration is a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`JobError`] when every attempt fails, when
    /// regeneration keeps coming back empty, or when the upload fails.
    #[instrument(
        skip(self, request, checkpoints, progress),
        fields(job_id = %checkpoints.job_id(), max_attempts = self.max_attempts())
    )]
    pub async fn run(
        &self,
        request: &AttemptLoopRequest,
        checkpoints: &Checkpoints,
        progress: Option<&dyn StageProgressSink>,
    ) -> AnimaticResult<RenderLoopOutcome> {
        let max_attempts = self.max_attempts();
        let mut current = request.script.clone();
        let mut history = AttemptHistory::new(self.loops.attempt_history_limit);
        let mut blocked = BlockedScripts::new();
        let mut warnings = Vec::new();
        let mut last_message = String::new();

        for attempt in 1..=max_attempts {
            let key = format!("render-attempt-{}", attempt);
            let result = checkpoints
                .run(&key, || {
                    self.render_attempt(attempt, &current, &request.options, progress)
                })
                .await?;

            match result {
                AttemptResult::Rendered {
                    video_path,
                    session_id,
                    warnings: render_warnings,
                } => {
                    warnings.extend(render_warnings);
                    let key = format!("upload-{}", attempt);
                    let video_url = checkpoints
                        .run(&key, || self.upload(&video_path, &request.owner_id))
                        .await?;

                    info!(
                        attempt,
                        session_id = %session_id,
                        video_url = %video_url,
                        "Render attempt succeeded"
                    );
                    return Ok(RenderLoopOutcome {
                        video_url,
                        video_path,
                        script: current,
                        render_attempts: attempt,
                        retried_after_error: attempt > 1,
                        failed_attempts: history.records(),
                        blocked_scripts: blocked.scripts(),
                        warnings,
                    });
                }
                AttemptResult::Failed { error, session_id } => {
                    last_message = error.message().to_string();
                    blocked.insert(&current);
                    let evicted = history.push(AttemptRecord::new(
                        attempt,
                        current.clone(),
                        error.clone(),
                        session_id,
                    ));
                    if evicted > 0 {
                        debug!(attempt, evicted, "Evicted oldest failed attempts");
                    }

                    if attempt == max_attempts {
                        break;
                    }

                    let key = format!("regenerate-{}", attempt);
                    let next = checkpoints
                        .run(&key, || {
                            self.regenerate(request, &current, &error, attempt, &history, &blocked)
                        })
                        .await?;

                    if blocked.contains(&next) {
                        warn!(
                            attempt,
                            fingerprint = %next.fingerprint().short(),
                            "Regenerated script matches a blocked script"
                        );
                    }
                    blocked.insert(&next);

                    let report = self.validator.run_heuristic_checks(&next);
                    if !report.ok {
                        let message = format!(
                            "Regenerated script for attempt {} failed heuristic checks: {}",
                            attempt + 1,
                            report.error_message()
                        );
                        warn!(attempt, "{}", message);
                        warnings.push(message);
                    }

                    current = next;
                }
            }
        }

        warn!(attempts = max_attempts, last_message = %last_message, "Render attempts exhausted");
        Err(JobError::new(JobErrorKind::RenderExhausted {
            attempts: max_attempts,
            last_message,
        })
        .into())
    }

    #[instrument(skip(self, script, options, progress), fields(fingerprint = %script.fingerprint().short()))]
    async fn render_attempt(
        &self,
        attempt: u32,
        script: &Script,
        options: &RenderOptions,
        progress: Option<&dyn StageProgressSink>,
    ) -> AnimaticResult<AttemptResult> {
        info!(attempt, "Starting render attempt");
        match self.renderer.render_once(script, options, progress).await {
            Ok(success) => Ok(AttemptResult::Rendered {
                video_path: success.video_path,
                session_id: success.session_id,
                warnings: success.warnings,
            }),
            Err(failure) => {
                let session_id = failure.session_label();
                warn!(
                    attempt,
                    stage = %failure.error.stage,
                    session_id = %session_id,
                    message = %failure.error.message(),
                    "Render attempt failed"
                );
                Ok(AttemptResult::Failed {
                    error: failure.error.into_details(),
                    session_id,
                })
            }
        }
    }

    async fn upload(&self, video_path: &Path, owner_id: &str) -> AnimaticResult<String> {
        self.uploader
            .upload_artifact(video_path, owner_id)
            .await
            .map_err(|e| JobError::new(JobErrorKind::UploadFailed(e.to_string())).into())
    }

    /// Ask for a new script, retrying empty answers on a fixed interval.
    #[instrument(skip(self, request, previous, error, history, blocked))]
    async fn regenerate(
        &self,
        request: &AttemptLoopRequest,
        previous: &Script,
        error: &ErrorDetails,
        attempt: u32,
        history: &AttemptHistory,
        blocked: &BlockedScripts,
    ) -> AnimaticResult<Script> {
        let regeneration = RegenerationRequest {
            prompt: request.prompt.clone(),
            previous_script: previous.clone(),
            error_message: error.message().to_string(),
            error_details: error.clone(),
            attempt_number: attempt,
            attempt_history: history.records(),
            blocked_scripts: blocked.scripts(),
        };

        let max_calls = self.loops.max_regeneration_calls.max(1);
        let calls = AtomicU32::new(0);
        let strategy = FixedInterval::new(self.loops.regeneration_retry_delay())
            .take(max_calls.saturating_sub(1) as usize);

        let result = Retry::spawn(strategy, || {
            let generator = Arc::clone(&self.generator);
            let regeneration = regeneration.clone();
            let calls = &calls;
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                match generator.regenerate_after_render_failure(&regeneration).await {
                    Ok(script) if !script.is_blank() => Ok(script.trimmed()),
                    Ok(_) => {
                        warn!(attempt, call, "Regeneration returned empty, will retry");
                        Err(RetryError::Transient {
                            err: GenerationError::new(GenerationErrorKind::EmptyRegeneration {
                                attempt,
                                calls: call,
                            }),
                            retry_after: None,
                        })
                    }
                    Err(e) => {
                        warn!(attempt, call, error = %e, "Regeneration failed, not retrying");
                        Err(RetryError::Permanent(GenerationError::new(
                            GenerationErrorKind::Provider(e.to_string()),
                        )))
                    }
                }
            }
        })
        .await;

        match result {
            Ok(script) => {
                info!(
                    attempt,
                    calls = calls.load(Ordering::SeqCst),
                    fingerprint = %script.fingerprint().short(),
                    "Regenerated script after render failure"
                );
                Ok(script)
            }
            Err(e) if e.is_empty_result() => Err(JobError::new(
                JobErrorKind::RegenerationExhausted {
                    attempt,
                    calls: calls.load(Ordering::SeqCst),
                },
            )
            .into()),
            Err(e) => Err(JobError::new(JobErrorKind::GenerationFailed(e.kind.to_string())).into()),
        }
    }
}

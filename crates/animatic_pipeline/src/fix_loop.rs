//! Heuristic validation with bounded repair.

use animatic_core::{Fingerprint, Script};
use animatic_error::{AnimaticResult, JobError, JobErrorKind};
use animatic_interface::{RepairRequest, ScriptGenerator, ScriptValidator};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What the fix loop produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ScriptFixOutcome {
    /// Best script available when the loop ended
    script: Script,
    /// Repair requests made
    repair_calls: u32,
    /// Whether the final script passes heuristic checks
    passed: bool,
    /// Stopped because a repair repeated an earlier script
    stopped_on_repeat: bool,
    /// Loop did not run because auto-fix left nothing unresolved
    skipped: bool,
    /// Last heuristic failure, when the script still fails
    last_error: Option<String>,
}

/// Validate a script and ask the generator to repair it, a bounded number
/// of times.
///
/// Running out of attempts is not fatal: the best script is handed on to
/// rendering. An empty repair is.
pub struct ScriptFixLoop {
    generator: Arc<dyn ScriptGenerator>,
    validator: Arc<dyn ScriptValidator>,
    max_attempts: u32,
}

impl ScriptFixLoop {
    /// Fix loop allowing `max_attempts` repairs (minimum 1).
    pub fn new(
        generator: Arc<dyn ScriptGenerator>,
        validator: Arc<dyn ScriptValidator>,
        max_attempts: u32,
    ) -> Self {
        Self {
            generator,
            validator,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Repair budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the loop.
    ///
    /// `needs_fixing` comes from the auto-fix pass; when it is false the
    /// script is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`JobError`] when a repair comes back empty or
    /// the generator fails.
    #[instrument(
        skip(self, script, prompt),
        fields(max_attempts = self.max_attempts, fingerprint = %script.fingerprint().short())
    )]
    pub async fn run(
        &self,
        script: Script,
        needs_fixing: bool,
        prompt: &str,
    ) -> AnimaticResult<ScriptFixOutcome> {
        if !needs_fixing {
            debug!("Auto-fix resolved all issues, skipping fix loop");
            return Ok(ScriptFixOutcome {
                script,
                repair_calls: 0,
                passed: true,
                stopped_on_repeat: false,
                skipped: true,
                last_error: None,
            });
        }

        let mut current = script;
        let mut seen: HashSet<Fingerprint> = HashSet::from([current.fingerprint()]);
        let mut repair_calls = 0;
        let mut stopped_on_repeat = false;

        for attempt in 1..=self.max_attempts {
            let report = self.validator.run_heuristic_checks(&current);
            if report.ok {
                info!(attempt, repair_calls, "Script passed heuristic checks");
                return Ok(ScriptFixOutcome {
                    script: current,
                    repair_calls,
                    passed: true,
                    stopped_on_repeat: false,
                    skipped: false,
                    last_error: None,
                });
            }

            let error = report.error_message();
            info!(attempt, error = %error, "Heuristic check failed, requesting repair");

            let request = RepairRequest {
                prompt: prompt.to_string(),
                previous_script: current.clone(),
                error,
                attempt_number: attempt,
            };
            repair_calls += 1;
            let repaired = self
                .generator
                .repair_script(&request)
                .await
                .map_err(|e| JobError::new(JobErrorKind::GenerationFailed(e.to_string())))?
                .trimmed();

            if repaired.is_blank() {
                warn!(attempt, "Script repair returned empty");
                return Err(JobError::new(JobErrorKind::EmptyRepair { attempt }).into());
            }

            let fp = repaired.fingerprint();
            current = repaired;
            if !seen.insert(fp.clone()) {
                warn!(
                    attempt,
                    fingerprint = %fp.short(),
                    "Repair repeated an earlier script, stopping fix loop"
                );
                stopped_on_repeat = true;
                break;
            }
        }

        let report = self.validator.run_heuristic_checks(&current);
        if !report.ok {
            warn!(
                repair_calls,
                error = %report.error_message(),
                "Fix loop ended with a failing script, continuing to render"
            );
        }

        Ok(ScriptFixOutcome {
            last_error: (!report.ok).then(|| report.error_message()),
            passed: report.ok,
            script: current,
            repair_calls,
            stopped_on_repeat,
            skipped: false,
        })
    }
}

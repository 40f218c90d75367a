//! Tests for the heuristic fix loop.

use animatic_core::Script;
use animatic_error::{AnimaticResult, JobErrorKind};
use animatic_interface::{
    AutoFixReport, GenerationContext, HeuristicReport, RegenerationRequest, RepairRequest,
    ScriptGenerator, ScriptValidator,
};
use animatic_pipeline::ScriptFixLoop;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Answers repair requests from a queue and records them.
#[derive(Default)]
struct QueuedRepairs {
    answers: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<RepairRequest>>,
}

impl QueuedRepairs {
    fn new(answers: &[&str]) -> Arc<Self> {
        let generator = Self::default();
        generator
            .answers
            .lock()
            .extend(answers.iter().map(|a| a.to_string()));
        Arc::new(generator)
    }

    fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ScriptGenerator for QueuedRepairs {
    async fn generate_script(&self, _context: &GenerationContext) -> AnimaticResult<Script> {
        Ok(Script::default())
    }

    async fn repair_script(&self, request: &RepairRequest) -> AnimaticResult<Script> {
        self.requests.lock().push(request.clone());
        Ok(Script::new(self.answers.lock().pop_front().unwrap_or_default()))
    }

    async fn regenerate_after_render_failure(
        &self,
        _request: &RegenerationRequest,
    ) -> AnimaticResult<Script> {
        Ok(Script::default())
    }
}

/// Fails any script containing `TODO`.
struct NoTodo;

impl ScriptValidator for NoTodo {
    fn run_heuristic_checks(&self, script: &Script) -> HeuristicReport {
        if script.as_str().contains("TODO") {
            HeuristicReport::failed("unfinished TODO in script")
        } else {
            HeuristicReport::passed()
        }
    }

    fn run_auto_fix(&self, script: &Script) -> AutoFixReport {
        AutoFixReport {
            ok: true,
            script: script.clone(),
            applied_fixes: Vec::new(),
            unfixable_reasons: Vec::new(),
        }
    }
}

fn fix_loop(generator: Arc<QueuedRepairs>) -> ScriptFixLoop {
    ScriptFixLoop::new(generator, Arc::new(NoTodo), 3)
}

#[tokio::test]
async fn test_passing_script_needs_no_repair() {
    let generator = QueuedRepairs::new(&[]);
    let outcome = fix_loop(generator.clone())
        .run(Script::new("self.play(Write(title))"), true, "prompt")
        .await
        .unwrap();

    assert_eq!(generator.calls(), 0);
    assert_eq!(*outcome.repair_calls(), 0);
    assert!(outcome.passed());
}

#[tokio::test]
async fn test_one_repair_then_pass() {
    let generator = QueuedRepairs::new(&["  self.play(Write(title))  \n"]);
    let outcome = fix_loop(generator.clone())
        .run(Script::new("# TODO animate"), true, "prompt")
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(outcome.passed());
    assert_eq!(outcome.script().as_str(), "self.play(Write(title))");

    let request = &generator.requests.lock()[0];
    assert_eq!(request.attempt_number, 1);
    assert_eq!(request.error, "unfinished TODO in script");
    assert_eq!(request.prompt, "prompt");
}

#[tokio::test]
async fn test_empty_repair_names_the_attempt() {
    let generator = QueuedRepairs::new(&["# TODO v2", "   "]);
    let err = fix_loop(generator)
        .run(Script::new("# TODO v1"), true, "prompt")
        .await
        .unwrap_err();

    assert!(err.is_non_retryable());
    assert!(err.to_string().contains("empty on attempt 2"));
    assert!(matches!(
        err.as_job_error().unwrap().kind,
        JobErrorKind::EmptyRepair { attempt: 2 }
    ));
}

#[tokio::test]
async fn test_repeated_repair_stops_early() {
    // Differs from the first repair only in whitespace and blank lines.
    let generator = QueuedRepairs::new(&["# TODO v2\nx = 1", "\n  # TODO v2\n\n  x = 1  \n"]);
    let outcome = fix_loop(generator.clone())
        .run(Script::new("# TODO v1"), true, "prompt")
        .await
        .unwrap();

    assert_eq!(generator.calls(), 2);
    assert!(outcome.stopped_on_repeat());
    assert!(!outcome.passed());
    assert!(outcome.last_error().is_some());
}

#[tokio::test]
async fn test_repair_matching_the_original_stops_early() {
    let generator = QueuedRepairs::new(&["# TODO v1\n"]);
    let outcome = fix_loop(generator.clone())
        .run(Script::new("# TODO v1"), true, "prompt")
        .await
        .unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(outcome.stopped_on_repeat());
}

#[tokio::test]
async fn test_exhausted_budget_hands_on_best_script() {
    let generator = QueuedRepairs::new(&["# TODO v2", "# TODO v3", "# TODO v4"]);
    let outcome = fix_loop(generator.clone())
        .run(Script::new("# TODO v1"), true, "prompt")
        .await
        .unwrap();

    assert_eq!(generator.calls(), 3);
    assert!(!outcome.passed());
    assert!(!outcome.stopped_on_repeat());
    assert_eq!(outcome.script().as_str(), "# TODO v4");
    let attempts: Vec<u32> = generator
        .requests
        .lock()
        .iter()
        .map(|r| r.attempt_number)
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_clean_auto_fix_skips_the_loop() {
    let generator = QueuedRepairs::new(&[]);
    let outcome = fix_loop(generator.clone())
        .run(Script::new("# TODO but auto-fix said fine"), false, "prompt")
        .await
        .unwrap();

    assert!(outcome.skipped());
    assert_eq!(generator.calls(), 0);
}

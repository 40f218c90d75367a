//! Tests for error classification and messages.

use animatic_core::{ErrorDetails, ValidationStage};
use animatic_error::{
    AnimaticError, AnimaticErrorKind, GENERIC_FAILURE_MESSAGE, GenerationError,
    GenerationErrorKind, JobError, JobErrorKind, SandboxError, SandboxErrorKind, StageError,
};

#[test]
fn test_only_job_errors_are_non_retryable() {
    let job: AnimaticError = JobError::new(JobErrorKind::EmptyRepair { attempt: 1 }).into();
    assert!(job.is_non_retryable());

    let stage: AnimaticError =
        StageError::message_only(ValidationStage::Render, "manim exited with 1").into();
    assert!(!stage.is_non_retryable());

    let sandbox: AnimaticError =
        SandboxError::new(SandboxErrorKind::Create("no capacity".into())).into();
    assert!(!sandbox.is_non_retryable());
}

#[test]
fn test_empty_repair_message_mentions_attempt() {
    let err = JobError::new(JobErrorKind::EmptyRepair { attempt: 1 });
    assert!(err.to_string().contains("empty on attempt 1"));
}

#[test]
fn test_render_exhausted_quotes_count_and_last_message() {
    let err: AnimaticError = JobError::new(JobErrorKind::RenderExhausted {
        attempts: 3,
        last_message: "NameError: name 'Circel' is not defined".into(),
    })
    .into();
    let text = err.to_string();
    assert!(text.contains("3 attempts"));
    assert!(text.contains("Circel"));
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
}

#[test]
fn test_stage_error_keeps_explicit_hint() {
    let err = StageError::new(
        ValidationStage::Latex,
        ErrorDetails::builder("latex missing").hint("use Text"),
    );
    assert_eq!(err.details.hint(), Some("use Text"));
    assert_eq!(err.stage, ValidationStage::Latex);
    assert_eq!(err.message(), "latex missing");
}

#[test]
fn test_stage_error_tags_details() {
    let err = StageError::message_only(ValidationStage::AstGuard, "import subprocess");
    let details = err.into_details();
    assert_eq!(details.stage(), Some(ValidationStage::AstGuard));
    assert_eq!(
        details.hint(),
        Some(ValidationStage::AstGuard.default_hint())
    );
}

#[test]
fn test_generation_empty_is_distinct_from_provider_failure() {
    let empty = GenerationError::new(GenerationErrorKind::EmptyRepair { attempt: 2 });
    let provider = GenerationError::new(GenerationErrorKind::Provider("429".into()));
    assert!(empty.is_empty_result());
    assert!(!provider.is_empty_result());

    let err: AnimaticError = provider.into();
    assert!(matches!(err.kind(), AnimaticErrorKind::Generation(_)));
}

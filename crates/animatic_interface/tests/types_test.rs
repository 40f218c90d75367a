//! Tests for collaborator request and report types.

use animatic_core::Script;
use animatic_interface::{
    AutoFixReport, CommandOutput, FinalState, HeuristicReport, SandboxCommand, VideoMetadata,
};
use std::time::Duration;

#[test]
fn test_auto_fix_report_unresolved_issues() {
    let clean = AutoFixReport {
        ok: true,
        script: Script::new("x = 1"),
        applied_fixes: vec!["added import".into()],
        unfixable_reasons: vec![],
    };
    assert!(!clean.has_unresolved_issues());

    let flagged = AutoFixReport {
        unfixable_reasons: vec!["uses 3D scene".into()],
        ..clean.clone()
    };
    assert!(flagged.has_unresolved_issues());

    let failed = AutoFixReport { ok: false, ..clean };
    assert!(failed.has_unresolved_issues());
}

#[test]
fn test_heuristic_report_message_fallback() {
    assert_eq!(
        HeuristicReport::failed("uses deprecated ShowCreation").error_message(),
        "uses deprecated ShowCreation"
    );
    let bare = HeuristicReport {
        ok: false,
        error: None,
    };
    assert_eq!(bare.error_message(), "Heuristic validation failed");
    assert!(HeuristicReport::passed().ok);
}

#[test]
fn test_sandbox_command_display() {
    let command = SandboxCommand::new("python3")
        .args(["-m", "py_compile"])
        .arg("scene.py")
        .timeout(Duration::from_secs(5));
    assert_eq!(command.display(), "python3 -m py_compile scene.py");
    assert_eq!(command.timeout, Some(Duration::from_secs(5)));
}

#[test]
fn test_command_output_success() {
    let ok = CommandOutput {
        exit_code: Some(0),
        ..Default::default()
    };
    let killed = CommandOutput::default();
    assert!(ok.success());
    assert!(!killed.success());
}

#[test]
fn test_final_state_is_tagged() {
    let state = FinalState::Completed {
        video_url: "https://cdn.example/v.mp4".into(),
        metadata: VideoMetadata::default(),
    };
    let value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["status"], "completed");

    let failed: FinalState =
        serde_json::from_value(serde_json::json!({"status": "failed", "message": "nope"}))
            .unwrap();
    assert_eq!(
        failed,
        FinalState::Failed {
            message: "nope".into()
        }
    );
}

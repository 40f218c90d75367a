//! Tests for the local process sandbox and the sandbox guard.

use animatic_error::SandboxErrorKind;
use animatic_interface::{SandboxCommand, SandboxProvider};
use animatic_render::{LocalSandboxProvider, RenderContext, SandboxConfig, SandboxGuard};
use std::sync::Arc;
use std::time::Duration;

fn provider(dir: &tempfile::TempDir) -> LocalSandboxProvider {
    LocalSandboxProvider::new(SandboxConfig::default().with_work_root(dir.path()))
}

#[tokio::test]
async fn test_files_round_trip_inside_session() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();

    sandbox.write_file("media/videos/a.mp4", b"abc").await.unwrap();
    sandbox.write_file("scene.py", b"print(1)").await.unwrap();

    assert_eq!(sandbox.read_file("media/videos/a.mp4").await.unwrap(), b"abc");
    assert!(sandbox.file_exists("scene.py").await.unwrap());
    assert!(!sandbox.file_exists("missing.py").await.unwrap());
    assert_eq!(
        sandbox.list_files("media").await.unwrap(),
        vec!["media/videos/a.mp4".to_string()]
    );
    assert!(sandbox.list_files("nowhere").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_paths_cannot_escape_session() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();

    let err = sandbox.write_file("../escape.txt", b"x").await.unwrap_err();
    assert!(matches!(err.kind, SandboxErrorKind::InvalidPath(_)));
    let err = sandbox.read_file("/etc/hostname").await.unwrap_err();
    assert!(matches!(err.kind, SandboxErrorKind::InvalidPath(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_captures_output_and_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();
    sandbox.write_file("note.txt", b"hello").await.unwrap();

    let output = sandbox
        .run(&SandboxCommand::new("sh").args(["-c", "cat note.txt; echo oops 1>&2; exit 3"]))
        .await
        .unwrap();

    assert_eq!(output.stdout, "hello");
    assert_eq!(output.stderr.trim(), "oops");
    assert_eq!(output.exit_code, Some(3));
    assert!(!output.success());
}

#[cfg(unix)]
#[tokio::test]
async fn test_oversized_output_is_capped_without_breaking_the_pipe() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();

    // `head` dies with SIGPIPE if the reader hangs up early, skipping `exit 7`.
    let output = sandbox
        .run(&SandboxCommand::new("sh").args(["-c", "head -c 11534336 /dev/zero && exit 7"]))
        .await
        .unwrap();

    assert_eq!(output.exit_code, Some(7));
    assert_eq!(output.stdout.len(), 10 * 1024 * 1024);
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();

    let err = sandbox
        .run(
            &SandboxCommand::new("sleep")
                .arg("5")
                .timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err.kind, SandboxErrorKind::Timeout { .. }));
}

#[tokio::test]
async fn test_missing_program_is_command_error() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();

    let err = sandbox
        .run(&SandboxCommand::new("definitely-not-a-real-binary-42"))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, SandboxErrorKind::Command { .. }));
}

#[tokio::test]
async fn test_guard_cleanup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let context = Arc::new(RenderContext::new());
    let sandbox = provider(&dir).create_sandbox().await.unwrap();
    let root = dir.path().join(sandbox.id());
    context.record_plugin_installed(sandbox.id(), "physics");

    let guard = SandboxGuard::new(sandbox, Arc::clone(&context));
    assert!(root.exists());

    assert!(guard.cleanup().await);
    assert!(!guard.cleanup().await);
    assert!(guard.is_cleaned());
    assert!(!root.exists());
    assert_eq!(context.cached_sandboxes(), 0);
}

#[tokio::test]
async fn test_dropped_guard_still_tears_down() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = provider(&dir).create_sandbox().await.unwrap();
    let root = dir.path().join(sandbox.id());

    drop(SandboxGuard::new(sandbox, Arc::new(RenderContext::new())));

    for _ in 0..50 {
        if !root.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!root.exists());
}

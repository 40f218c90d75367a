//! Tests for the render state machine against a scripted sandbox.

use animatic_core::{RenderOptions, RenderQuality, Script, ValidationStage, WatermarkOptions};
use animatic_error::{SandboxError, SandboxErrorKind};
use animatic_interface::{
    CommandOutput, Renderer, Sandbox, SandboxCommand, SandboxProvider, SandboxResult,
    StageProgressSink,
};
use animatic_render::{RenderContext, RenderPipeline, SandboxConfig};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const SCENE: &str = "from manim import *\n\nclass Intro(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n";

const PROBE_720P: &str = r#"{"streams":[{"codec_type":"video","width":1280,"height":720}],"format":{"duration":"4.0"}}"#;

/// Shared record of what the mock sandboxes saw.
#[derive(Default)]
struct Ledger {
    commands: Mutex<Vec<String>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl Ledger {
    fn ran(&self, needle: &str) -> bool {
        self.commands.lock().iter().any(|c| c.contains(needle))
    }

    fn count(&self, needle: &str) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

/// How the mock toolchain behaves.
#[derive(Clone)]
struct Behavior {
    /// Commands containing this text exit 1.
    fail_on: Option<&'static str>,
    /// Where the renderer writes its output.
    render_path: &'static str,
    /// ffprobe stdout.
    probe_json: &'static str,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            fail_on: None,
            render_path: "media/videos/scene/720p30/Intro.mp4",
            probe_json: PROBE_720P,
        }
    }
}

struct MockSandbox {
    id: String,
    behavior: Behavior,
    ledger: Arc<Ledger>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

fn exit(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code: Some(code),
        duration_ms: 1,
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, command: &SandboxCommand) -> SandboxResult<CommandOutput> {
        let display = command.display();
        self.ledger.commands.lock().push(display.clone());

        if let Some(needle) = self.behavior.fail_on {
            if display.contains(needle) {
                return Ok(exit(1, "", &format!("Traceback\nRuntimeError: {} failed", needle)));
            }
        }

        match command.program.as_str() {
            "manim" => {
                self.files
                    .lock()
                    .insert(self.behavior.render_path.to_string(), b"rendered".to_vec());
                Ok(exit(0, "File ready", ""))
            }
            "ffprobe" => Ok(exit(0, self.behavior.probe_json, "")),
            "ffmpeg" => {
                let out = command.args.last().cloned().unwrap_or_default();
                self.files.lock().insert(out, b"processed".to_vec());
                Ok(exit(0, "", "frame=100"))
            }
            _ => Ok(exit(0, "", "")),
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> SandboxResult<()> {
        self.files.lock().insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> SandboxResult<Vec<u8>> {
        self.files.lock().get(path).cloned().ok_or_else(|| {
            SandboxError::new(SandboxErrorKind::FileIo {
                path: path.to_string(),
                message: "not found".to_string(),
            })
        })
    }

    async fn file_exists(&self, path: &str) -> SandboxResult<bool> {
        Ok(self.files.lock().contains_key(path))
    }

    async fn list_files(&self, dir: &str) -> SandboxResult<Vec<String>> {
        let prefix = format!("{}/", dir);
        Ok(self
            .files
            .lock()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn destroy(&self) -> SandboxResult<()> {
        self.ledger.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct MockProvider {
    behavior: Behavior,
    ledger: Arc<Ledger>,
    unavailable: bool,
}

#[async_trait]
impl SandboxProvider for MockProvider {
    async fn create_sandbox(&self) -> SandboxResult<Box<dyn Sandbox>> {
        if self.unavailable {
            return Err(SandboxError::new(SandboxErrorKind::Create(
                "no capacity".to_string(),
            )));
        }
        let n = self.ledger.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSandbox {
            id: format!("mock-{}", n),
            behavior: self.behavior.clone(),
            ledger: Arc::clone(&self.ledger),
            files: Mutex::new(HashMap::new()),
        }))
    }
}

#[derive(Default)]
struct Progress(Mutex<Vec<(u8, String)>>);

impl StageProgressSink for Progress {
    fn on_stage(&self, progress: u8, label: &str) {
        self.0.lock().push((progress, label.to_string()));
    }
}

fn pipeline(behavior: Behavior) -> (RenderPipeline, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::default());
    let provider = MockProvider {
        behavior,
        ledger: Arc::clone(&ledger),
        unavailable: false,
    };
    let pipeline = RenderPipeline::new(
        Arc::new(provider),
        Arc::new(RenderContext::new()),
        SandboxConfig::default(),
    );
    (pipeline, ledger)
}

fn options(dir: &tempfile::TempDir) -> RenderOptions {
    RenderOptions::builder()
        .quality(RenderQuality::Medium)
        .output_dir(dir.path().to_path_buf())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_render_downloads_video() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior::default());
    let progress = Progress::default();

    let success = pipeline
        .render_once(&Script::new(SCENE), &options(&dir), Some(&progress))
        .await
        .expect("render succeeds");

    assert_eq!(success.session_id, "mock-0");
    assert_eq!((success.width, success.height), (1280, 720));
    assert_eq!(std::fs::read(&success.video_path).unwrap(), b"rendered");
    assert!(success.video_path.starts_with(dir.path()));
    assert!(!success.logs.is_empty());
    assert!(success.warnings.is_empty());
    assert_eq!(ledger.destroyed.load(Ordering::SeqCst), 1);

    let calls = progress.0.lock().clone();
    assert_eq!(calls.first().map(|c| c.1.as_str()), Some("Preparing sandbox"));
    assert_eq!(calls.last().map(|c| c.1.as_str()), Some("Downloading video"));
    assert!(calls.windows(2).all(|w| w[0].0 < w[1].0));
}

#[tokio::test]
async fn test_syntax_failure_stops_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior {
        fail_on: Some("py_compile"),
        ..Behavior::default()
    });

    let failure = pipeline
        .render_once(&Script::new(SCENE), &options(&dir), None)
        .await
        .expect_err("render fails");

    assert_eq!(failure.error.stage, ValidationStage::Syntax);
    assert_eq!(failure.error.message(), "RuntimeError: py_compile failed");
    assert_eq!(failure.error.details.exit_code(), Some(1));
    assert!(failure.error.details.hint().is_some());
    assert!(failure.error.details.logs().is_some());
    assert_eq!(failure.session_id.as_deref(), Some("mock-0"));
    assert!(!ledger.ran("manim"));
    assert_eq!(ledger.destroyed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cleanup_runs_once_whichever_stage_fails() {
    let cases = [
        ("ast_guard", ValidationStage::AstGuard),
        ("scene_check", ValidationStage::SceneValidation),
        ("manim", ValidationStage::Render),
        ("ffprobe", ValidationStage::VideoValidation),
    ];
    for (needle, stage) in cases {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, ledger) = pipeline(Behavior {
            fail_on: Some(needle),
            ..Behavior::default()
        });

        let failure = pipeline
            .render_once(&Script::new(SCENE), &options(&dir), None)
            .await
            .expect_err("render fails");

        assert_eq!(failure.error.stage, stage, "failing on {}", needle);
        assert_eq!(ledger.destroyed.load(Ordering::SeqCst), 1, "failing on {}", needle);
    }
}

#[tokio::test]
async fn test_sandbox_creation_failure_is_input_stage() {
    let ledger = Arc::new(Ledger::default());
    let pipeline = RenderPipeline::new(
        Arc::new(MockProvider {
            behavior: Behavior::default(),
            ledger: Arc::clone(&ledger),
            unavailable: true,
        }),
        Arc::new(RenderContext::new()),
        SandboxConfig::default(),
    );
    let dir = tempfile::tempdir().unwrap();

    let failure = pipeline
        .render_once(&Script::new(SCENE), &options(&dir), None)
        .await
        .expect_err("render fails");

    assert_eq!(failure.error.stage, ValidationStage::Input);
    assert!(failure.session_id.is_none());
    assert_eq!(ledger.destroyed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_script_fails_before_any_command() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior::default());

    let failure = pipeline
        .render_once(&Script::new("   \n"), &options(&dir), None)
        .await
        .expect_err("render fails");

    assert_eq!(failure.error.stage, ValidationStage::Input);
    assert!(ledger.commands.lock().is_empty());
    assert_eq!(ledger.destroyed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_plugin_install_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior {
        fail_on: Some("pip install"),
        ..Behavior::default()
    });
    let script = "from manim import *\nfrom manim_physics import *\n\nclass Intro(Scene):\n    def construct(self):\n        self.wait()\n";

    let success = pipeline
        .render_once(&Script::new(script), &options(&dir), None)
        .await
        .expect("render succeeds without the plugin");

    assert_eq!(success.warnings.len(), 1);
    assert!(success.warnings[0].contains("physics"));
    assert!(success.warnings[0].contains("plugin-installation"));
    assert!(!ledger.ran("import manim_physics"));
}

#[tokio::test]
async fn test_latex_verified_once_per_context() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior::default());
    let script = Script::new(
        "from manim import *\n\nclass Intro(Scene):\n    def construct(self):\n        self.play(Write(MathTex(r\"x^2\")))\n",
    );

    for _ in 0..2 {
        pipeline
            .render_once(&script, &options(&dir), None)
            .await
            .expect("render succeeds");
    }

    assert_eq!(ledger.count("latex --version"), 1);
    assert!(pipeline.context().latex_verified());
    assert_eq!(ledger.destroyed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_latex_fails_latex_stage() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, _ledger) = pipeline(Behavior {
        fail_on: Some("latex --version"),
        ..Behavior::default()
    });
    let script = Script::new(
        "class Intro(Scene):\n    def construct(self):\n        self.add(Tex(\"hi\"))\n",
    );

    let failure = pipeline
        .render_once(&script, &options(&dir), None)
        .await
        .expect_err("render fails");

    assert_eq!(failure.error.stage, ValidationStage::Latex);
    assert!(!pipeline.context().latex_verified());
}

#[tokio::test]
async fn test_output_found_by_directory_walk() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, _ledger) = pipeline(Behavior {
        render_path: "media/videos/scene/custom/Intro.mp4",
        ..Behavior::default()
    });

    let success = pipeline
        .render_once(&Script::new(SCENE), &options(&dir), None)
        .await
        .expect("render succeeds");

    assert!(
        success
            .logs
            .iter()
            .any(|e| e.message().contains("directory walk"))
    );
}

#[tokio::test]
async fn test_dimension_mismatch_fails_video_validation() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, _ledger) = pipeline(Behavior {
        probe_json: r#"{"streams":[{"codec_type":"video","width":640,"height":360}],"format":{"duration":"4.0"}}"#,
        ..Behavior::default()
    });

    let failure = pipeline
        .render_once(&Script::new(SCENE), &options(&dir), None)
        .await
        .expect_err("render fails");

    assert_eq!(failure.error.stage, ValidationStage::VideoValidation);
    assert!(failure.error.message().contains("640x360"));
}

#[tokio::test]
async fn test_watermark_output_is_downloaded() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior::default());
    let options = RenderOptions::builder()
        .output_dir(dir.path().to_path_buf())
        .watermark(WatermarkOptions::new("demo"))
        .build()
        .unwrap();

    let success = pipeline
        .render_once(&Script::new(SCENE), &options, None)
        .await
        .expect("render succeeds");

    assert!(ledger.ran("drawtext=text='demo'"));
    assert_eq!(std::fs::read(&success.video_path).unwrap(), b"processed");
}

#[tokio::test]
async fn test_snippet_is_wrapped_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let (pipeline, ledger) = pipeline(Behavior {
        render_path: "media/videos/scene/720p30/GeneratedScene.mp4",
        ..Behavior::default()
    });
    let snippet = "# DIAGRAM_SCHEMA: flowchart_v1\nbox = Square()\nself.play(Create(box))\n";

    pipeline
        .render_once(&Script::new(snippet), &options(&dir), None)
        .await
        .expect("render succeeds");

    assert!(ledger.ran("scene.py GeneratedScene"));
}

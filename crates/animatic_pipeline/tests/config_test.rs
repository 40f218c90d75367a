//! Tests for configuration loading and validation.

use animatic_core::{RenderQuality, WatermarkPosition};
use animatic_pipeline::{LoopConfig, PipelineConfig};
use std::io::Write;
use std::path::PathBuf;

#[test]
fn test_defaults_allow_three_of_everything() {
    let config = PipelineConfig::default();
    assert_eq!(config.loops.max_script_fix_attempts, 3);
    assert_eq!(config.loops.max_render_attempts, 3);
    assert_eq!(config.loops.attempt_history_limit, 3);
    assert_eq!(config.loops.max_regeneration_calls, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_reads_bundled_defaults() {
    let config = PipelineConfig::load().unwrap();
    assert_eq!(config.loops.max_render_attempts, 3);
    assert_eq!(*config.render.quality(), RenderQuality::Medium);
    let watermark = config.render.watermark().as_ref().unwrap();
    assert_eq!(*watermark.position(), WatermarkPosition::BottomRight);
    assert!(!config.messages.generic_failure.is_empty());
    assert_eq!(config.progress.drain_timeout().as_millis(), 2000);
}

#[test]
fn test_from_file_fills_missing_sections() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[loops]
max_render_attempts = 5

[render]
quality = "high"
speed = 1.25

[output]
dir = "/srv/videos"
"#
    )
    .unwrap();

    let config = PipelineConfig::from_file(file.path()).unwrap();

    assert_eq!(config.loops.max_render_attempts, 5);
    assert_eq!(config.loops.max_script_fix_attempts, 3);
    assert_eq!(*config.render.quality(), RenderQuality::High);
    let options = config.render_options();
    assert_eq!(options.speed_factor(), Some(1.25));
    assert_eq!(options.output_dir(), &PathBuf::from("/srv/videos"));
    assert_eq!(*config.sandbox.command_timeout_secs(), 120);
}

#[test]
fn test_zero_budgets_are_rejected() {
    let config = PipelineConfig {
        loops: LoopConfig {
            max_render_attempts: 0,
            ..LoopConfig::default()
        },
        ..PipelineConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("loops.max_render_attempts"));
}

#[test]
fn test_invalid_file_is_a_config_error() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[loops]\nmax_render_attempts = \"many\"").unwrap();

    let err = PipelineConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration Error"));
}

#[test]
fn test_inverted_duration_bounds_are_rejected() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[render]\nmin_duration_secs = 10.0\nmax_duration_secs = 5.0").unwrap();

    let err = PipelineConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("duration bounds"));
}

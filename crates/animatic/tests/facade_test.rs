//! The facade exposes the whole pipeline from one crate.

use animatic::{
    AttemptHistory, GENERIC_FAILURE_MESSAGE, PipelineConfig, RenderContext, Script,
    ValidationStage, fingerprint,
};

#[test]
fn test_fingerprint_ignores_layout_only_changes() {
    let a = Script::new("self.play(Create(c))\n\n    self.wait()\n");
    let b = Script::new("  self.play(Create(c))\nself.wait()");
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(fingerprint("x\n\n"), fingerprint("  x"));
    assert_ne!(a.fingerprint(), Script::new("self.wait()").fingerprint());
}

#[test]
fn test_facade_types_interoperate() {
    let config = PipelineConfig::default();
    assert_eq!(config.messages.generic_failure, GENERIC_FAILURE_MESSAGE);

    let history = AttemptHistory::new(config.loops.attempt_history_limit);
    assert_eq!(history.limit(), 3);

    let context = RenderContext::new();
    assert!(!context.latex_verified());
    assert_eq!(ValidationStage::Input.to_string(), "input");
}

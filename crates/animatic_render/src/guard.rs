//! Scoped sandbox ownership with exactly-once teardown.

use crate::RenderContext;
use animatic_interface::Sandbox;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owns one sandbox for one render attempt.
///
/// [`cleanup`](Self::cleanup) destroys the sandbox at most once; later calls
/// are no-ops. If the guard is dropped before cleanup ran (an early return
/// or a panic unwinding through the pipeline) teardown is spawned on the
/// current runtime.
pub struct SandboxGuard {
    sandbox: Arc<dyn Sandbox>,
    context: Arc<RenderContext>,
    cleaned: AtomicBool,
}

impl SandboxGuard {
    /// Take ownership of a freshly created sandbox.
    pub fn new(sandbox: Box<dyn Sandbox>, context: Arc<RenderContext>) -> Self {
        Self {
            sandbox: Arc::from(sandbox),
            context,
            cleaned: AtomicBool::new(false),
        }
    }

    /// The guarded sandbox.
    pub fn sandbox(&self) -> &dyn Sandbox {
        self.sandbox.as_ref()
    }

    /// Session id of the guarded sandbox.
    pub fn id(&self) -> &str {
        self.sandbox.id()
    }

    /// Whether teardown already ran.
    pub fn is_cleaned(&self) -> bool {
        self.cleaned.load(Ordering::Acquire)
    }

    /// Tear the sandbox down. Returns `false` when it was already torn down.
    ///
    /// Teardown failures are logged, not returned: the attempt's outcome is
    /// already decided.
    #[tracing::instrument(skip(self), fields(session_id = %self.id()))]
    pub async fn cleanup(&self) -> bool {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            tracing::debug!("Sandbox already cleaned up");
            return false;
        }
        self.context.evict_sandbox(self.sandbox.id());
        match self.sandbox.destroy().await {
            Ok(()) => tracing::debug!("Sandbox destroyed"),
            Err(e) => tracing::warn!(error = %e, "Sandbox teardown failed"),
        }
        true
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        if self.cleaned.swap(true, Ordering::AcqRel) {
            return;
        }
        let id = self.sandbox.id().to_string();
        self.context.evict_sandbox(&id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(session_id = %id, "Sandbox guard dropped without cleanup; tearing down");
                let sandbox = Arc::clone(&self.sandbox);
                handle.spawn(async move {
                    if let Err(e) = sandbox.destroy().await {
                        tracing::warn!(session_id = %id, error = %e, "Deferred sandbox teardown failed");
                    }
                });
            }
            Err(_) => {
                tracing::error!(session_id = %id, "Sandbox leaked: no runtime available for teardown");
            }
        }
    }
}

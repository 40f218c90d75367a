//! Render context shared by attempts on one worker.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cross-attempt render state, owned by a worker and passed to the pipeline.
///
/// Holds the "LaTeX verified" flag and the plugin install cache. Both are
/// optimizations: a stale or empty context only causes a check to run again.
///
/// The plugin cache is keyed by sandbox id. Every attempt leases a new
/// sandbox and entries are evicted at teardown, so across attempts the cache
/// never hits; it only deduplicates installs within one sandbox. The hit
/// counter makes this observable.
#[derive(Debug, Default)]
pub struct RenderContext {
    latex_verified: AtomicBool,
    plugin_cache: Mutex<HashMap<String, HashSet<String>>>,
    plugin_cache_hits: AtomicU64,
}

impl RenderContext {
    /// Fresh context with nothing verified.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the LaTeX toolchain was verified by an earlier render.
    pub fn latex_verified(&self) -> bool {
        self.latex_verified.load(Ordering::Acquire)
    }

    /// Record a successful LaTeX check.
    pub fn mark_latex_verified(&self) {
        self.latex_verified.store(true, Ordering::Release);
    }

    /// Whether `plugin` was already installed in `sandbox_id`.
    pub fn is_plugin_installed(&self, sandbox_id: &str, plugin: &str) -> bool {
        let hit = self
            .plugin_cache
            .lock()
            .get(sandbox_id)
            .is_some_and(|plugins| plugins.contains(plugin));
        if hit {
            self.plugin_cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    /// Record an install.
    pub fn record_plugin_installed(&self, sandbox_id: &str, plugin: &str) {
        self.plugin_cache
            .lock()
            .entry(sandbox_id.to_string())
            .or_default()
            .insert(plugin.to_string());
    }

    /// Drop cache entries for a torn-down sandbox.
    pub fn evict_sandbox(&self, sandbox_id: &str) {
        self.plugin_cache.lock().remove(sandbox_id);
    }

    /// Cache hits so far.
    pub fn plugin_cache_hits(&self) -> u64 {
        self.plugin_cache_hits.load(Ordering::Relaxed)
    }

    /// Sandboxes with cache entries.
    pub fn cached_sandboxes(&self) -> usize {
        self.plugin_cache.lock().len()
    }
}

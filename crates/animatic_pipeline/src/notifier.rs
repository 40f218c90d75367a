//! Fire-and-forget job progress.

use animatic_core::ProgressUpdate;
use animatic_interface::{ProgressReporter, StageProgressSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Messages for the progress task.
#[derive(Debug)]
pub enum ProgressMessage {
    /// Forward an update to the reporter
    Update(ProgressUpdate),
    /// Stop after draining earlier updates
    Shutdown,
}

/// Non-blocking progress notifications for one job.
///
/// Updates are queued on a channel and delivered in order by a background
/// task. Reporter failures are logged and counted, never returned. Callers
/// never wait on delivery except in [`shutdown`](Self::shutdown), and that
/// wait is bounded.
#[derive(Debug)]
pub struct ProgressNotifier {
    tx: mpsc::UnboundedSender<ProgressMessage>,
    handle: Option<JoinHandle<()>>,
    failures: Arc<AtomicU64>,
}

impl ProgressNotifier {
    /// Start the delivery task. Must be called inside a tokio runtime.
    pub fn spawn(reporter: Arc<dyn ProgressReporter>, job_id: impl Into<String>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));
        let job_id = job_id.into();
        let task_failures = Arc::clone(&failures);

        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    ProgressMessage::Update(update) => {
                        let progress = *update.progress();
                        if let Err(e) = reporter.report_progress(&job_id, update).await {
                            task_failures.fetch_add(1, Ordering::Relaxed);
                            warn!(job_id = %job_id, progress, error = %e, "Progress report failed");
                        }
                    }
                    ProgressMessage::Shutdown => {
                        debug!(job_id = %job_id, "Progress notifier shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            tx,
            handle: Some(handle),
            failures,
        }
    }

    /// Queue an update.
    pub fn notify(&self, update: ProgressUpdate) {
        if self.tx.send(ProgressMessage::Update(update)).is_err() {
            debug!("Progress notifier closed, dropping update");
        }
    }

    /// Queue an update built from a percentage and step label.
    pub fn step(&self, progress: u8, step: &str) {
        info!(progress, step, "Job progress");
        self.notify(ProgressUpdate::new(progress, step));
    }

    /// Sink for render stage transitions, scaled into `[start, end]`.
    pub fn stage_sink(&self, start: u8, end: u8) -> RenderProgressBridge {
        RenderProgressBridge {
            tx: self.tx.clone(),
            start: start.min(end),
            end: end.max(start),
        }
    }

    /// Reports that failed so far.
    pub fn failed_reports(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Deliver queued updates for at most `grace`, then stop the task.
    ///
    /// Updates still queued when the grace period runs out are dropped, along
    /// with any report in flight.
    #[instrument(skip(self), fields(grace_ms = grace.as_millis() as u64))]
    pub async fn shutdown(mut self, grace: Duration) -> u64 {
        let _ = self.tx.send(ProgressMessage::Shutdown);
        if let Some(mut handle) = self.handle.take() {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Progress task ended abnormally"),
                Err(_) => {
                    warn!("Progress reporter did not drain in time, abandoning queued updates");
                    handle.abort();
                }
            }
        }
        self.failed_reports()
    }
}

/// Maps render stage progress onto a slice of the job's progress bar.
#[derive(Debug, Clone)]
pub struct RenderProgressBridge {
    tx: mpsc::UnboundedSender<ProgressMessage>,
    start: u8,
    end: u8,
}

impl RenderProgressBridge {
    /// Job-level percentage for a render percentage.
    pub fn scale(&self, progress: u8) -> u8 {
        let span = u32::from(self.end - self.start);
        let scaled = u32::from(self.start) + span * u32::from(progress.min(100)) / 100;
        scaled as u8
    }
}

impl StageProgressSink for RenderProgressBridge {
    fn on_stage(&self, progress: u8, label: &str) {
        let update = ProgressUpdate::new(self.scale(progress), "Rendering video").with_details(label);
        let _ = self.tx.send(ProgressMessage::Update(update));
    }
}

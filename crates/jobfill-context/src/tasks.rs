//! Best-effort background work.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, warn, Instrument};

#[derive(Debug, Default)]
struct Counters {
    spawned: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of background task counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundMetrics {
    pub spawned: u64,
    pub failed: u64,
    pub active: usize,
}

/// Named fire-and-forget tasks.
///
/// Nothing on the critical path awaits these. Failures are logged here and
/// nowhere else. Cloning shares the tracker.
#[derive(Clone)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    counters: Arc<Counters>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tracker: TaskTracker::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Run `future` in the background under `name`.
    pub fn spawn<F, E>(&self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.counters.spawned.fetch_add(1, Ordering::Relaxed);
        let counters = self.counters.clone();
        let span = tracing::debug_span!("background_task", task_name = name);

        debug!(task_name = name, "Spawning background task");
        self.tracker.spawn(
            async move {
                if let Err(e) = future.await {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(task_name = name, "Background task failed: {}", e);
                }
            }
            .instrument(span),
        );
    }

    pub fn metrics(&self) -> BackgroundMetrics {
        BackgroundMetrics {
            spawned: self.counters.spawned.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            active: self.tracker.len(),
        }
    }

    /// Close the tracker and wait for running tasks.
    pub async fn close_and_wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Wait for everything spawned so far; the tracker stays usable.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

//! Process-wide pool of pre-started workers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::job::TransformJob;
use crate::worker::Worker;

/// Workers started ahead of time, shared by every [`WorkerPool`](crate::WorkerPool)
/// that was given it.
///
/// Pools poll [`is_initialized`](Self::is_initialized) before drawing from it;
/// until then they serve tasks from their own dedicated workers.
#[derive(Debug, Default)]
pub struct WarmPool {
    initialized: AtomicBool,
    workers: Mutex<Vec<Worker>>,
}

impl WarmPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Starts `count` workers running `job` and marks the pool initialized.
    pub fn prewarm(count: usize, job: Arc<dyn TransformJob>) -> Arc<Self> {
        let pool = Self::new();
        pool.fill(count, job);
        pool
    }

    /// Starts `count` more workers, then marks the pool initialized.
    pub fn fill(&self, count: usize, job: Arc<dyn TransformJob>) {
        let mut started = 0;
        for _ in 0..count {
            let id = self.workers.lock().len();
            match Worker::spawn(format!("kiln-warm-{}", id), Arc::clone(&job)) {
                Ok(worker) => {
                    self.workers.lock().push(worker);
                    started += 1;
                }
                Err(err) => warn!(error = %err, "failed to start warm worker"),
            }
        }
        info!(started, "warm workers ready");
        self.mark_initialized();
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Number of warm workers not yet taken.
    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn pop(&self) -> Option<Worker> {
        self.workers.lock().pop()
    }
}

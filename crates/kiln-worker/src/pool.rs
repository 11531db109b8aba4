//! Task dispatch onto dedicated and warm workers

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

use crate::error::TaskError;
use crate::job::TransformJob;
use crate::protocol::{TaskId, TaskOutput, TaskPayload, TaskResult, TaskStatus, WorkerRequest};
use crate::warm::WarmPool;
use crate::worker::Worker;

/// Default number of dedicated workers
pub const DEFAULT_WORKER_COUNT: usize = 3;

/// Default interval between warm-pool readiness checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Upper bound on dedicated workers; they are started on demand
    pub capacity: usize,
    pub poll_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_WORKER_COUNT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Runs transform tasks on worker threads.
///
/// Cloning is cheap and clones share the same workers. Tasks are never
/// retried and a lost worker is not replaced.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    job: Arc<dyn TransformJob>,
    options: PoolOptions,
    warm: Option<Arc<WarmPool>>,
    idle: Mutex<VecDeque<Worker>>,
    available: Notify,
    /// Dedicated workers started so far
    spawned: AtomicUsize,
    /// Workers in the dedicated pool that have not been lost
    live: AtomicUsize,
    sequence: AtomicU64,
}

/// Where a leased worker came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Dedicated,
    Warm,
}

/// Completion handle for a submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    status: Arc<Mutex<TaskStatus>>,
    result: oneshot::Receiver<Result<TaskOutput, TaskError>>,
}

impl TaskHandle {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.lock()
    }

    /// Waits for the task to finish.
    pub async fn wait(self) -> Result<TaskOutput, TaskError> {
        match self.result.await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Protocol(format!(
                "dispatcher for task {} stopped without a result",
                self.id
            ))),
        }
    }
}

impl WorkerPool {
    pub fn new(job: Arc<dyn TransformJob>, options: PoolOptions) -> Self {
        Self::build(job, options, None)
    }

    /// A pool that draws from `warm` once it is initialized.
    pub fn with_warm_pool(job: Arc<dyn TransformJob>, options: PoolOptions, warm: Arc<WarmPool>) -> Self {
        Self::build(job, options, Some(warm))
    }

    fn build(job: Arc<dyn TransformJob>, options: PoolOptions, warm: Option<Arc<WarmPool>>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                job,
                options,
                warm,
                idle: Mutex::new(VecDeque::new()),
                available: Notify::new(),
                spawned: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Dedicated workers still alive.
    pub fn live_workers(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Queues `payload` under `task_key`. Must be called inside a Tokio runtime.
    pub fn submit(&self, task_key: &str, payload: TaskPayload) -> TaskHandle {
        let id = TaskId {
            module_id: task_key.to_string(),
            sequence: self.inner.sequence.fetch_add(1, Ordering::SeqCst),
        };
        let status = Arc::new(Mutex::new(TaskStatus::Queued));
        let (sender, receiver) = oneshot::channel();

        let inner = Arc::clone(&self.inner);
        let task_id = id.clone();
        let task_status = Arc::clone(&status);
        tokio::spawn(async move {
            let result = inner.dispatch(task_id, payload, &task_status).await;
            *task_status.lock() = if result.is_ok() {
                TaskStatus::Done
            } else {
                TaskStatus::Failed
            };
            let _ = sender.send(result);
        });

        TaskHandle {
            id,
            status,
            result: receiver,
        }
    }
}

impl PoolInner {
    async fn dispatch(
        &self,
        task_id: TaskId,
        payload: TaskPayload,
        status: &Mutex<TaskStatus>,
    ) -> Result<TaskOutput, TaskError> {
        let (worker, origin) = self.acquire().await?;
        *status.lock() = TaskStatus::Running;
        debug!(task = %task_id, worker = worker.name(), ?origin, "dispatching task");

        let (reply, response) = oneshot::channel();
        let request = WorkerRequest {
            task_id: task_id.clone(),
            payload,
            reply,
        };

        if worker.send(request).is_err() {
            self.lose(worker, origin, &task_id);
            return Err(TaskError::WorkerLost(task_id));
        }

        match response.await {
            Ok(response) => {
                self.release(worker, origin);
                if response.task_id != task_id {
                    return Err(TaskError::Protocol(format!(
                        "expected reply for {}, got {}",
                        task_id, response.task_id
                    )));
                }
                match response.result {
                    TaskResult::Success(output) => Ok(output),
                    TaskResult::Failure { error } => Err(TaskError::Transform(error)),
                }
            }
            // The reply sender is dropped when the worker thread dies mid-task
            Err(_) => {
                self.lose(worker, origin, &task_id);
                Err(TaskError::WorkerLost(task_id))
            }
        }
    }

    async fn acquire(&self) -> Result<(Worker, Origin), TaskError> {
        if let Some(warm) = &self.warm {
            loop {
                if warm.is_initialized() {
                    if let Some(worker) = warm.pop() {
                        return Ok((worker, Origin::Warm));
                    }
                    break;
                }
                if let Some(worker) = self.take_idle() {
                    return Ok((worker, Origin::Dedicated));
                }
                if self.dedicated_exhausted() {
                    return Err(TaskError::NoWorkers);
                }
                tokio::time::sleep(self.options.poll_interval).await;
            }
        }

        self.acquire_dedicated().await.map(|worker| (worker, Origin::Dedicated))
    }

    async fn acquire_dedicated(&self) -> Result<Worker, TaskError> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(worker) = self.take_idle() {
                return Ok(worker);
            }
            if self.dedicated_exhausted() {
                // Wake the next waiter so it fails too
                self.available.notify_one();
                return Err(TaskError::NoWorkers);
            }

            notified.await;
        }
    }

    /// Every dedicated worker was started and has since been lost.
    fn dedicated_exhausted(&self) -> bool {
        self.live.load(Ordering::SeqCst) == 0 && self.spawned.load(Ordering::SeqCst) >= self.options.capacity
    }

    /// An idle dedicated worker, or a newly started one while under capacity.
    fn take_idle(&self) -> Option<Worker> {
        if let Some(worker) = self.idle.lock().pop_front() {
            return Some(worker);
        }

        let mut spawned = self.spawned.load(Ordering::SeqCst);
        while spawned < self.options.capacity {
            match self.spawned.compare_exchange(
                spawned,
                spawned + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return match Worker::spawn(format!("kiln-worker-{}", spawned), Arc::clone(&self.job)) {
                        Ok(worker) => {
                            self.live.fetch_add(1, Ordering::SeqCst);
                            Some(worker)
                        }
                        Err(err) => {
                            warn!(error = %err, "failed to start worker");
                            None
                        }
                    };
                }
                Err(actual) => spawned = actual,
            }
        }
        None
    }

    fn release(&self, worker: Worker, origin: Origin) {
        if origin == Origin::Warm {
            // Adopted into the dedicated pool
            self.live.fetch_add(1, Ordering::SeqCst);
        }
        self.idle.lock().push_back(worker);
        self.available.notify_one();
    }

    fn lose(&self, worker: Worker, origin: Origin, task_id: &TaskId) {
        warn!(task = %task_id, worker = worker.name(), ?origin, "worker lost");
        drop(worker);
        if origin == Origin::Dedicated {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.available.notify_one();
    }
}

//! Dedicated transform worker threads

use std::sync::{mpsc, Arc};
use std::thread;

use tracing::{debug, trace};

use crate::job::TransformJob;
use crate::protocol::{TaskResult, WorkerRequest, WorkerResponse};

/// Handle to one worker thread.
///
/// The thread owns its job and runs one request at a time from its inbox.
/// Dropping the handle closes the inbox and lets the thread exit.
#[derive(Debug)]
pub struct Worker {
    name: String,
    inbox: mpsc::Sender<WorkerRequest>,
}

impl Worker {
    /// Starts a thread called `name` that runs `job` for every request.
    pub fn spawn(name: String, job: Arc<dyn TransformJob>) -> std::io::Result<Self> {
        let (inbox, requests) = mpsc::channel::<WorkerRequest>();
        let thread_name = name.clone();

        thread::Builder::new().name(name.clone()).spawn(move || {
            debug!(worker = thread_name.as_str(), "worker started");
            while let Ok(request) = requests.recv() {
                trace!(worker = thread_name.as_str(), task = %request.task_id, "running task");
                let result = match job.run(&request.payload) {
                    Ok(output) => TaskResult::Success(output),
                    Err(error) => TaskResult::Failure { error },
                };
                // The submitter may have stopped waiting
                let _ = request.reply.send(WorkerResponse {
                    task_id: request.task_id,
                    result,
                });
            }
            debug!(worker = thread_name.as_str(), "worker stopped");
        })?;

        Ok(Self { name, inbox })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `request`; hands it back if the thread is gone.
    pub(crate) fn send(&self, request: WorkerRequest) -> Result<(), WorkerRequest> {
        self.inbox.send(request).map_err(|err| err.0)
    }
}

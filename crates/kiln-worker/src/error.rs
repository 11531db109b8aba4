//! Error types for task dispatch and transpilation

use thiserror::Error;

use crate::protocol::TaskId;

/// Failure of a single submitted task. The pool stays usable after any of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    /// The job ran and rejected the input
    #[error("transform failed: {0}")]
    Transform(String),

    /// The worker thread died before replying
    #[error("worker running task {0} was lost")]
    WorkerLost(TaskId),

    /// Every worker has been lost
    #[error("no workers available")]
    NoWorkers,

    /// The reply did not match the request
    #[error("worker protocol error: {0}")]
    Protocol(String),
}

/// Orchestrator failure for one module
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to transpile {path}: {source}")]
pub struct TranspileError {
    pub path: String,
    #[source]
    pub source: TaskError,
}

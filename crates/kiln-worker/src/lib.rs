//! # Kiln Worker
//!
//! Moves CPU-bound module transforms off the control thread.
//!
//! A [`WorkerPool`] owns a small set of OS threads, each running a
//! [`TransformJob`] over requests from its own inbox. The
//! [`TranspileOrchestrator`] sits in front of the pool and decides per module
//! whether a worker round trip is needed at all, recording dependency edges
//! and errors in the caller's [`CompilationContext`].

pub mod context;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pool;
pub mod protocol;
mod warm;
mod worker;

pub use context::{CompilationContext, Configurations, LoaderContext, LoaderOptions, PackageInfo};
pub use error::{TaskError, TranspileError};
pub use job::{ModuleTransform, TransformJob};
pub use orchestrator::{derive_runtime_version, TranspileOrchestrator, DEFAULT_DEPENDENCY_ROOT};
pub use pool::{PoolOptions, TaskHandle, WorkerPool, DEFAULT_POLL_INTERVAL, DEFAULT_WORKER_COUNT};
pub use protocol::{
    FeatureFlags, ModuleDependency, RuntimeVersion, TaskId, TaskOutput, TaskPayload, TaskResult, TaskStatus,
    TranspileConfig,
};
pub use warm::WarmPool;
pub use worker::Worker;

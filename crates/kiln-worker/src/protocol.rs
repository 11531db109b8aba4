//! Messages exchanged between the control thread and transform workers

use std::collections::BTreeMap;
use std::fmt;

use kiln_rewrite::Dependency;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Identity of one submitted task: the module key plus a pool-wide sequence number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub module_id: String,
    pub sequence: u64,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.module_id, self.sequence)
    }
}

/// Runtime generation the output targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeVersion {
    #[default]
    Legacy,
    Modern,
}

/// Transform settings resolved for one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileConfig {
    /// Emit a `"use strict";` prologue for the modern runtime
    pub strict_mode: bool,
    /// Free-form settings passed through to custom jobs
    pub extra: BTreeMap<String, String>,
}

impl Default for TranspileConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// A macro package is among the project dependencies
    pub macros: bool,
}

/// Work sent to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub code: String,
    pub config: TranspileConfig,
    pub path: String,
    pub target_version: RuntimeVersion,
    pub features: FeatureFlags,
}

/// A dependency reported by a worker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDependency {
    pub path: String,
    #[serde(default)]
    pub is_glob: bool,
}

impl From<Dependency> for ModuleDependency {
    fn from(dependency: Dependency) -> Self {
        Self {
            path: dependency.path,
            is_glob: dependency.is_glob,
        }
    }
}

/// Successful worker output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub transpiled_code: String,
    pub dependencies: Vec<ModuleDependency>,
}

/// `{transpiled_code, dependencies}` or `{error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Success(TaskOutput),
    Failure { error: String },
}

/// Reply sent back by a worker, correlated by task id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub task_id: TaskId,
    pub result: TaskResult,
}

/// Request placed in a worker's inbox
#[derive(Debug)]
pub struct WorkerRequest {
    pub task_id: TaskId,
    pub payload: TaskPayload,
    pub reply: oneshot::Sender<WorkerResponse>,
}

/// Lifecycle of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_result_wire_shape() {
        let failure = TaskResult::Failure {
            error: "boom".into(),
        };
        assert_eq!(serde_json::to_string(&failure).unwrap(), r#"{"error":"boom"}"#);

        let success: TaskResult = serde_json::from_str(
            r#"{"transpiled_code":"x","dependencies":[{"path":"./a"}]}"#,
        )
        .unwrap();
        match success {
            TaskResult::Success(output) => {
                assert_eq!(output.transpiled_code, "x");
                assert!(!output.dependencies[0].is_glob);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_runtime_version_and_task_id() {
        assert_eq!(serde_json::to_string(&RuntimeVersion::Modern).unwrap(), "\"modern\"");
        let id = TaskId {
            module_id: "/src/a.js".into(),
            sequence: 4,
        };
        assert_eq!(id.to_string(), "/src/a.js#4");
    }
}

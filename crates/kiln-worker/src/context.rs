//! Per-module compilation context handed to the orchestrator

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::protocol::{RuntimeVersion, TranspileConfig};

/// Dependency lists from a `package.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageInfo {
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageInfo {
    /// Names from both `dependencies` and `devDependencies`.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .map(String::as_str)
    }
}

/// Configuration snapshot resolved for the project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configurations {
    pub transpile: Option<TranspileConfig>,
    pub package: Option<PackageInfo>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoaderOptions {
    /// Pass CommonJS through without a worker round trip
    pub simple_require: bool,
    /// Overrides the runtime derived from the package manifest
    pub target_version: Option<RuntimeVersion>,
    pub configurations: Configurations,
}

/// What the orchestrator needs from its caller while transpiling one module.
pub trait CompilationContext {
    fn path(&self) -> &str;

    fn module_id(&self) -> &str;

    fn options(&self) -> &LoaderOptions;

    fn add_dependency(&mut self, path: &str);

    /// Registers every file under `directory` as a possible dependency.
    fn add_dependencies_in_directory(&mut self, directory: &str);

    fn emit_error(&mut self, error: &TaskError);
}

/// Context that records everything it is told.
#[derive(Debug, Clone, Default)]
pub struct LoaderContext {
    path: String,
    module_id: String,
    options: LoaderOptions,
    dependencies: Vec<String>,
    directory_dependencies: Vec<String>,
    errors: Vec<TaskError>,
}

impl LoaderContext {
    /// A context whose module id is its path.
    pub fn new(path: impl Into<String>, options: LoaderOptions) -> Self {
        let path = path.into();
        Self {
            module_id: path.clone(),
            path,
            options,
            ..Default::default()
        }
    }

    pub fn with_module_id(mut self, module_id: impl Into<String>) -> Self {
        self.module_id = module_id.into();
        self
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn directory_dependencies(&self) -> &[String] {
        &self.directory_dependencies
    }

    pub fn errors(&self) -> &[TaskError] {
        &self.errors
    }
}

impl CompilationContext for LoaderContext {
    fn path(&self) -> &str {
        &self.path
    }

    fn module_id(&self) -> &str {
        &self.module_id
    }

    fn options(&self) -> &LoaderOptions {
        &self.options
    }

    fn add_dependency(&mut self, path: &str) {
        if !self.dependencies.iter().any(|existing| existing == path) {
            self.dependencies.push(path.to_string());
        }
    }

    fn add_dependencies_in_directory(&mut self, directory: &str) {
        if !self.directory_dependencies.iter().any(|existing| existing == directory) {
            self.directory_dependencies.push(directory.to_string());
        }
    }

    fn emit_error(&mut self, error: &TaskError) {
        self.errors.push(error.clone());
    }
}

//! Project build: fetch dependencies, transpile reachable modules, write output

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_packager::{FetchFailure, PackagerClient, RangeMap};
use kiln_worker::{
    Configurations, LoaderContext, LoaderOptions, ModuleTransform, TransformJob, TranspileOrchestrator, WarmPool,
    WorkerPool,
};
use tracing::{debug, info, warn};

use crate::config::KilnConfig;
use crate::graph::{ModuleGraph, ModuleNode};
use crate::package_json::{parse_package_json_str, PackageJson, PackageJsonError};
use crate::resolver::{ModuleResolver, ResolvedModule};
use crate::vfs::{dirname, join, VirtualFs};

/// Entry candidates tried when neither the caller nor package.json names one
const DEFAULT_ENTRIES: [&str; 3] = ["/src/index.js", "/index.js", "/src/main.js"];

const MODULE_EXTENSIONS: [&str; 4] = [".js", ".mjs", ".cjs", ".json"];

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to read project: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    PackageJson(#[from] PackageJsonError),

    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    #[error("entry module not found: {0}")]
    EntryNotFound(String),
}

/// Outcome of [`ProjectBuilder::build`]
#[derive(Debug)]
pub struct BuildReport {
    pub graph: ModuleGraph,
    /// Dependencies first
    pub order: Vec<String>,
    pub cycles: Vec<Vec<String>>,
}

impl BuildReport {
    /// Writes every transpiled module under `out_dir`, keeping its path.
    pub async fn write_to(&self, out_dir: &Path) -> std::io::Result<usize> {
        let mut written = 0;
        for path in &self.order {
            let Some(node) = self.graph.get_module(path) else {
                continue;
            };
            let target = out_dir.join(path.trim_start_matches('/'));
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &node.transpiled).await?;
            written += 1;
        }
        Ok(written)
    }
}

/// Drives the whole pipeline for one project directory.
pub struct ProjectBuilder {
    config: KilnConfig,
    orchestrator: TranspileOrchestrator,
    packager: PackagerClient,
}

impl ProjectBuilder {
    pub fn new(config: KilnConfig) -> Self {
        let packager = PackagerClient::new(config.packager.packager_config())
            .with_policy(config.packager.retry_policy());
        Self::with_packager(config, packager)
    }

    pub fn with_packager(config: KilnConfig, packager: PackagerClient) -> Self {
        let orchestrator = create_orchestrator(&config);
        Self {
            config,
            orchestrator,
            packager,
        }
    }

    pub fn orchestrator(&self) -> &TranspileOrchestrator {
        &self.orchestrator
    }

    /// Builds the project in `project_dir` starting at `entry` (a path
    /// relative to the project root), or at the entry named by its
    /// package.json.
    pub async fn build(&self, project_dir: &Path, entry: Option<&str>) -> Result<BuildReport, BuildError> {
        let mut vfs = VirtualFs::from_dir(project_dir)?;
        let package = match vfs.read("/package.json") {
            Some(content) => parse_package_json_str(content)?,
            None => PackageJson::default(),
        };
        info!(files = vfs.len(), "project loaded");

        let ranges: RangeMap = package
            .dependencies
            .iter()
            .map(|(name, range)| (name.clone(), range.clone()))
            .collect();
        if let Some(manifest) = self.packager.fetch(&ranges).await? {
            vfs.overlay_manifest(&manifest);
            info!(files = manifest.file_count(), "dependencies overlaid");
        }

        let resolver = ModuleResolver::new(self.orchestrator.dependency_root());
        let entry = find_entry(&vfs, &resolver, &package, entry)?;
        let graph = self.transpile_graph(&vfs, &resolver, &package, &entry).await;

        let cycles = graph.find_cycles();
        for cycle in &cycles {
            warn!(cycle = cycle.join(" -> ").as_str(), "circular dependency");
        }
        let order = graph.dependency_order();

        Ok(BuildReport { graph, order, cycles })
    }

    async fn transpile_graph(
        &self,
        vfs: &VirtualFs,
        resolver: &ModuleResolver,
        package: &PackageJson,
        entry: &str,
    ) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        graph.set_entry(entry);

        let options = LoaderOptions {
            simple_require: false,
            target_version: None,
            configurations: Configurations {
                transpile: Some(self.config.transpile.transpile_config()),
                package: Some(package.package_info()),
            },
        };

        let mut queue: VecDeque<String> = VecDeque::from([entry.to_string()]);
        let mut seen: HashSet<String> = HashSet::from([entry.to_string()]);

        while let Some(path) = queue.pop_front() {
            let Some(source) = vfs.read(&path) else {
                continue;
            };
            let mut node = ModuleNode {
                path: path.clone(),
                ..Default::default()
            };

            if path.ends_with(".json") {
                node.transpiled = format!("module.exports = {};", source.trim());
                graph.add_module(node);
                continue;
            }

            let mut ctx = LoaderContext::new(path.as_str(), options.clone());
            node.transpiled = match self.orchestrator.transpile(source, &mut ctx).await {
                Ok(code) => code,
                Err(err) => {
                    warn!(path = path.as_str(), error = %err, "module failed to transpile");
                    node.errors.push(err.to_string());
                    source.to_string()
                }
            };

            let mut discovered = Vec::new();
            for specifier in ctx.dependencies() {
                match resolver.resolve(vfs, specifier, &path) {
                    Ok(ResolvedModule::LocalFile(resolved)) | Ok(ResolvedModule::Package(resolved)) => {
                        node.dependencies.push(resolved.clone());
                        discovered.push(resolved);
                    }
                    Ok(ResolvedModule::Builtin(name)) => {
                        debug!(module = name.as_str(), "skipping built-in module");
                    }
                    Err(err) => {
                        warn!(path = path.as_str(), error = %err, "unresolved dependency");
                        node.errors.push(err.to_string());
                    }
                }
            }

            for directory in ctx.directory_dependencies() {
                let directory = join(dirname(&path), directory);
                discovered.extend(
                    vfs.files_in_directory(&directory)
                        .filter(|file| MODULE_EXTENSIONS.iter().any(|ext| file.ends_with(ext)))
                        .map(str::to_string),
                );
                node.directory_dependencies.push(directory);
            }

            for module in discovered {
                if seen.insert(module.clone()) {
                    queue.push_back(module);
                }
            }
            graph.add_module(node);
        }

        graph
    }
}

/// Builds the orchestrator over a worker pool sized by `config`.
pub fn create_orchestrator(config: &KilnConfig) -> TranspileOrchestrator {
    let job: Arc<dyn TransformJob> = Arc::new(ModuleTransform);
    let options = config.workers.pool_options();
    let pool = if config.workers.prewarm > 0 {
        let warm = WarmPool::prewarm(config.workers.prewarm, Arc::clone(&job));
        WorkerPool::with_warm_pool(job, options, warm)
    } else {
        WorkerPool::new(job, options)
    };

    TranspileOrchestrator::new(pool)
        .with_dependency_root(config.transpile.dependency_root.clone())
        .with_default_config(config.transpile.transpile_config())
}

fn find_entry(
    vfs: &VirtualFs,
    resolver: &ModuleResolver,
    package: &PackageJson,
    entry: Option<&str>,
) -> Result<String, BuildError> {
    let requested = entry
        .map(str::to_string)
        .or_else(|| package.entry().map(str::to_string));

    if let Some(requested) = requested {
        let specifier = format!("/{}", requested.trim_start_matches("./").trim_start_matches('/'));
        return match resolver.resolve(vfs, &specifier, "/package.json") {
            Ok(ResolvedModule::LocalFile(path)) | Ok(ResolvedModule::Package(path)) => Ok(path),
            _ => Err(BuildError::EntryNotFound(requested)),
        };
    }

    DEFAULT_ENTRIES
        .iter()
        .find(|candidate| vfs.is_file(candidate))
        .map(|candidate| candidate.to_string())
        .ok_or_else(|| BuildError::EntryNotFound(DEFAULT_ENTRIES.join(", ")))
}

/// Output directory default: `<project>/dist`.
pub fn default_out_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("dist")
}

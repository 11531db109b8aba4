//! Per-module transpile decisions

use kiln_rewrite::{extract_requires, is_es_module, needs_transpile, rewrite};
use tracing::{debug, warn};

use crate::context::{CompilationContext, PackageInfo};
use crate::error::TranspileError;
use crate::pool::WorkerPool;
use crate::protocol::{FeatureFlags, ModuleDependency, RuntimeVersion, TaskPayload, TranspileConfig};

/// Default location of installed packages
pub const DEFAULT_DEPENDENCY_ROOT: &str = "/node_modules";

/// Decides per module whether to rewrite in place, pass through, or hand the
/// source to a worker, and records the resulting edges in the context.
#[derive(Clone)]
pub struct TranspileOrchestrator {
    pool: WorkerPool,
    dependency_root: String,
    default_config: TranspileConfig,
}

impl TranspileOrchestrator {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            dependency_root: DEFAULT_DEPENDENCY_ROOT.to_string(),
            default_config: TranspileConfig::default(),
        }
    }

    pub fn with_dependency_root(mut self, root: impl Into<String>) -> Self {
        self.dependency_root = root.into();
        self
    }

    /// Config used when the context carries none.
    pub fn with_default_config(mut self, config: TranspileConfig) -> Self {
        self.default_config = config;
        self
    }

    pub fn dependency_root(&self) -> &str {
        &self.dependency_root
    }

    /// Transpiles `source` for the module described by `ctx`.
    pub async fn transpile<C>(&self, source: &str, ctx: &mut C) -> Result<String, TranspileError>
    where
        C: CompilationContext + ?Sized,
    {
        let path = ctx.path().to_string();
        let in_dependencies = path.contains(&self.dependency_root);

        let mut code = source.to_string();
        if in_dependencies && is_es_module(&code) {
            match rewrite(&code) {
                Ok(rewritten) => code = rewritten,
                Err(err) => {
                    warn!(path = path.as_str(), error = %err, "module rewrite failed, treating as CommonJS")
                }
            }
        }

        let options = ctx.options();
        if !needs_transpile(&code)
            && (options.simple_require || path.starts_with(&self.dependency_root))
        {
            debug!(path = path.as_str(), "passing CommonJS through");
            for dependency in extract_requires(&code) {
                register(ctx, dependency.into());
            }
            return Ok(code);
        }

        let configurations = &options.configurations;
        let payload = TaskPayload {
            code,
            config: configurations
                .transpile
                .clone()
                .unwrap_or_else(|| self.default_config.clone()),
            path: path.clone(),
            target_version: options
                .target_version
                .unwrap_or_else(|| derive_runtime_version(configurations.package.as_ref())),
            features: FeatureFlags {
                macros: uses_macros(configurations.package.as_ref()),
            },
        };

        let handle = self.pool.submit(ctx.module_id(), payload);
        match handle.wait().await {
            Ok(output) => {
                for dependency in output.dependencies {
                    register(ctx, dependency);
                }
                Ok(output.transpiled_code)
            }
            Err(source) => {
                ctx.emit_error(&source);
                Err(TranspileError { path, source })
            }
        }
    }
}

fn register<C: CompilationContext + ?Sized>(ctx: &mut C, dependency: ModuleDependency) {
    if dependency.is_glob {
        ctx.add_dependencies_in_directory(&dependency.path);
    } else {
        ctx.add_dependency(&dependency.path);
    }
}

/// True when a runtime dependency (not a dev dependency) looks like a macro package.
fn uses_macros(package: Option<&PackageInfo>) -> bool {
    package.is_some_and(|package| package.dependencies.keys().any(|name| name.contains("macro")))
}

/// `Modern` when the project depends on Babel's core or one of its presets.
pub fn derive_runtime_version(package: Option<&PackageInfo>) -> RuntimeVersion {
    let Some(package) = package else {
        return RuntimeVersion::Legacy;
    };
    if package
        .dependency_names()
        .any(|name| name == "@babel/core" || name.starts_with("@babel/preset-"))
    {
        RuntimeVersion::Modern
    } else {
        RuntimeVersion::Legacy
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::{Configurations, LoaderContext, LoaderOptions};
    use crate::job::ModuleTransform;
    use crate::pool::PoolOptions;

    fn orchestrator() -> TranspileOrchestrator {
        TranspileOrchestrator::new(WorkerPool::new(Arc::new(ModuleTransform), PoolOptions::default()))
    }

    #[tokio::test]
    async fn test_dependency_module_is_rewritten_and_passed_through() {
        let mut ctx = LoaderContext::new("/node_modules/lib/index.js", LoaderOptions::default());
        let code = orchestrator()
            .transpile("import dep from 'dep';\nexport default dep;", &mut ctx)
            .await
            .unwrap();

        assert!(code.contains("require(\"dep\")"));
        assert!(code.contains("exports.default = "));
        assert_eq!(ctx.dependencies(), ["dep".to_string()]);
    }

    #[tokio::test]
    async fn test_simple_require_skips_worker() {
        let options = LoaderOptions {
            simple_require: true,
            ..Default::default()
        };
        let mut ctx = LoaderContext::new("/src/a.js", options);
        let source = "const b = require('./b');\nconst l = require(`./locale/${lang}`);";
        let code = orchestrator().transpile(source, &mut ctx).await.unwrap();

        assert_eq!(code, source);
        assert_eq!(ctx.dependencies(), ["./b".to_string()]);
        assert_eq!(ctx.directory_dependencies(), ["./locale".to_string()]);
    }

    #[tokio::test]
    async fn test_project_module_goes_through_worker() {
        let mut package = PackageInfo::default();
        package.dev_dependencies.insert("@babel/core".into(), "7".into());
        let options = LoaderOptions {
            configurations: Configurations {
                transpile: None,
                package: Some(package),
            },
            ..Default::default()
        };
        let mut ctx = LoaderContext::new("/src/a.js", options);
        let code = orchestrator()
            .transpile("export const a = require('./b');", &mut ctx)
            .await
            .unwrap();

        assert!(code.starts_with("\"use strict\";\n"));
        assert_eq!(ctx.dependencies(), ["./b".to_string()]);
    }

    #[tokio::test]
    async fn test_worker_failure_is_emitted() {
        let mut ctx = LoaderContext::new("/src/broken.js", LoaderOptions::default());
        let err = orchestrator()
            .transpile("export const s = 'open", &mut ctx)
            .await
            .unwrap_err();

        assert_eq!(err.path, "/src/broken.js");
        assert_eq!(ctx.errors().len(), 1);
        assert!(matches!(ctx.errors()[0], crate::error::TaskError::Transform(_)));
    }

    #[test]
    fn test_macros_flag_ignores_dev_dependencies() {
        assert!(!uses_macros(None));

        let mut package = PackageInfo::default();
        package.dev_dependencies.insert("babel-plugin-macros".into(), "3".into());
        assert!(!uses_macros(Some(&package)));

        package.dependencies.insert("styled-components/macro".into(), "5".into());
        assert!(uses_macros(Some(&package)));
    }

    #[test]
    fn test_runtime_version_from_package() {
        assert_eq!(derive_runtime_version(None), RuntimeVersion::Legacy);

        let mut package = PackageInfo::default();
        package.dependencies.insert("react".into(), "18".into());
        assert_eq!(derive_runtime_version(Some(&package)), RuntimeVersion::Legacy);

        package.dev_dependencies.insert("@babel/preset-env".into(), "7".into());
        assert_eq!(derive_runtime_version(Some(&package)), RuntimeVersion::Modern);

        let mut package = PackageInfo::default();
        package.dependencies.insert("@babel/core".into(), "7".into());
        assert_eq!(derive_runtime_version(Some(&package)), RuntimeVersion::Modern);
    }
}

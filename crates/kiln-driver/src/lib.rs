//! Kiln Driver Library
//!
//! Glue between the core crates and the `kiln` command line: configuration
//! loading, package manifests, a virtual file system holding project and
//! dependency files, Node-style resolution over it, and the module graph
//! built while transpiling a project.

pub mod build;
pub mod config;
pub mod graph;
pub mod package_json;
pub mod resolver;
pub mod vfs;

pub use build::{create_orchestrator, BuildError, BuildReport, ProjectBuilder};
pub use config::{load_config, load_config_file, ConfigError, KilnConfig};
pub use graph::{ModuleGraph, ModuleNode};
pub use package_json::{parse_package_json, PackageJson};
pub use resolver::{ModuleResolver, ResolveError, ResolvedModule};
pub use vfs::VirtualFs;

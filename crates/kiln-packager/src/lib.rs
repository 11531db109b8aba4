//! # Kiln Packager
//!
//! Resolves a package manifest's dependency ranges to absolute versions and
//! fetches the prebuilt file manifest for that exact set from the packager
//! backend, asking the backend to build it first when needed.
//!
//! A set is addressed by its sorted `name@version` pairs, so the same set
//! always maps to the same bucket path however the input was ordered.

pub mod address;
pub mod backend;
pub mod cache;
pub mod client;
pub mod dependencies;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod resolver;
pub mod retry;

pub use address::{CacheAddress, QueryAddress, DEFAULT_SCHEMA_VERSION};
pub use backend::{BackendResponse, HttpBackend, Method, PackagerBackend};
pub use cache::ManifestCache;
pub use client::{PackagerClient, PackagerConfig, DEFAULT_BUCKET_URL, DEFAULT_PACKAGER_URL};
pub use dependencies::{normalize, normalize_range, DependencySet, RangeMap};
pub use error::{FetchError, FetchFailure};
pub use manifest::{Manifest, ManifestDependency, ManifestFile, PackagerPointer, TransitiveDependency};
pub use progress::{Phase, ProgressEvent, ProgressSink, TracingProgress};
pub use resolver::{resolve_all, RegistryResolver, VersionResolver, DEFAULT_REGISTRY_URL};
pub use retry::{RetryPolicy, DEFAULT_BUILDING_STATUSES, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

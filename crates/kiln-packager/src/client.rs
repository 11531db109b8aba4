//! Fetching the manifest for a set of package ranges

use std::sync::Arc;

use tracing::{debug, info};

use crate::address::{CacheAddress, QueryAddress, DEFAULT_SCHEMA_VERSION};
use crate::backend::{HttpBackend, Method, PackagerBackend};
use crate::cache::ManifestCache;
use crate::dependencies::{normalize, DependencySet, RangeMap};
use crate::error::{FetchError, FetchFailure};
use crate::manifest::{Manifest, PackagerPointer};
use crate::progress::{Phase, ProgressEvent, ProgressSink, TracingProgress};
use crate::resolver::{resolve_all, RegistryResolver, VersionResolver, DEFAULT_REGISTRY_URL};
use crate::retry::RetryPolicy;

pub const DEFAULT_BUCKET_URL: &str = "https://prod-packager-packages.codesandbox.io";
pub const DEFAULT_PACKAGER_URL: &str = "https://aiwi8rnkp5.execute-api.eu-west-1.amazonaws.com/prod/packages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagerConfig {
    /// Read-only store of built manifests
    pub bucket_url: String,
    /// Build trigger
    pub packager_url: String,
    pub registry_url: String,
    pub schema_version: u32,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            bucket_url: DEFAULT_BUCKET_URL.to_string(),
            packager_url: DEFAULT_PACKAGER_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION,
        }
    }
}

/// Resolves package ranges and fetches the built manifest for them.
///
/// The first request for a set that the bucket does not have triggers a
/// build. Concurrent first requests for the same set each trigger it, so the
/// packager endpoint has to be idempotent.
pub struct PackagerClient {
    config: PackagerConfig,
    policy: RetryPolicy,
    backend: Arc<dyn PackagerBackend>,
    resolver: Arc<dyn VersionResolver>,
    progress: Arc<dyn ProgressSink>,
    cache: Arc<ManifestCache>,
    full_screen: bool,
}

impl PackagerClient {
    /// A client talking HTTP to the endpoints in `config`.
    pub fn new(config: PackagerConfig) -> Self {
        let backend: Arc<dyn PackagerBackend> = Arc::new(HttpBackend::new());
        Self::with_backend(config, backend)
    }

    /// A client over `backend`, resolving against `config.registry_url`
    /// through the same backend.
    pub fn with_backend(config: PackagerConfig, backend: Arc<dyn PackagerBackend>) -> Self {
        let resolver = Arc::new(RegistryResolver::new(Arc::clone(&backend), config.registry_url.clone()));
        Self {
            config,
            policy: RetryPolicy::default(),
            backend,
            resolver,
            progress: Arc::new(TracingProgress),
            cache: Arc::new(ManifestCache::new()),
            full_screen: false,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn VersionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Shares `cache` with other clients.
    pub fn with_cache(mut self, cache: Arc<ManifestCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Whether progress is shown as a full-screen loader.
    pub fn with_full_screen(mut self, full_screen: bool) -> Self {
        self.full_screen = full_screen;
        self
    }

    pub fn cache(&self) -> &Arc<ManifestCache> {
        &self.cache
    }

    pub fn cache_address(&self, set: &DependencySet) -> CacheAddress {
        CacheAddress::new(set, self.config.schema_version)
    }

    /// Drops the cached manifest for `set`.
    pub fn invalidate(&self, set: &DependencySet) -> bool {
        self.cache.invalidate(&self.cache_address(set))
    }

    /// Resolves `ranges` and returns their manifest, or `None` when there is
    /// nothing to fetch.
    pub async fn fetch(&self, ranges: &RangeMap) -> Result<Option<Arc<Manifest>>, FetchFailure> {
        if ranges.is_empty() {
            return Ok(None);
        }

        let manifest = self.fetch_manifest(ranges).await?;
        if self.full_screen {
            self.report(Phase::Transpiling);
        }
        Ok(Some(manifest))
    }

    async fn fetch_manifest(&self, ranges: &RangeMap) -> Result<Arc<Manifest>, FetchError> {
        let set = resolve_all(self.resolver.as_ref(), &normalize(ranges)).await?;
        let address = self.cache_address(&set);

        if let Some(manifest) = self.cache.get(&address) {
            debug!(%address, "manifest served from memory");
            return Ok(manifest);
        }

        self.report(Phase::Downloading);
        let manifest = match self.read_bucket(&address).await {
            Some(manifest) => manifest,
            None => {
                self.report(Phase::Resolving);
                let query = QueryAddress::new(&set);
                let trigger_url = format!("{}/{}", self.config.packager_url, query);
                let pointer: PackagerPointer = self
                    .policy
                    .request(self.backend.as_ref(), Method::Post, &trigger_url)
                    .await?;

                self.report(Phase::Downloading);
                let artifact_url = format!("{}/{}", self.config.bucket_url, pointer.url);
                self.policy
                    .request(self.backend.as_ref(), Method::Get, &artifact_url)
                    .await?
            }
        };

        let manifest = Arc::new(manifest);
        info!(%address, files = manifest.file_count(), "dependencies fetched");
        self.cache.insert(address, Arc::clone(&manifest));
        Ok(manifest)
    }

    /// The prebuilt manifest, if the bucket has one.
    async fn read_bucket(&self, address: &CacheAddress) -> Option<Manifest> {
        let url = format!("{}/{}", self.config.bucket_url, address);
        match self.backend.request(Method::Get, &url).await {
            Ok(response) if response.is_success() => match response.json(&url) {
                Ok(manifest) => Some(manifest),
                Err(err) => {
                    debug!(error = %err, "unreadable bucket manifest, rebuilding");
                    None
                }
            },
            Ok(response) => {
                debug!(status = response.status, url = url.as_str(), "bucket miss");
                None
            }
            Err(err) => {
                debug!(error = %err, "bucket unreachable");
                None
            }
        }
    }

    fn report(&self, phase: Phase) {
        self.progress.report(ProgressEvent::new(phase, self.full_screen));
    }
}

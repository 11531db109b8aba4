//! Turning version ranges into absolute versions

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use semver::{Version, VersionReq};
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::debug;

use crate::backend::{Method, PackagerBackend};
use crate::dependencies::{DependencySet, RangeMap};
use crate::error::FetchError;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

#[async_trait]
pub trait VersionResolver: Send + Sync {
    /// The absolute version `range` stands for.
    async fn resolve(&self, name: &str, range: &str) -> Result<String, FetchError>;
}

/// Resolves every range of `ranges` concurrently.
pub async fn resolve_all<R>(resolver: &R, ranges: &RangeMap) -> Result<DependencySet, FetchError>
where
    R: VersionResolver + ?Sized,
{
    let resolved = try_join_all(ranges.iter().map(|(name, range)| async move {
        let version = resolver.resolve(name, range).await?;
        debug!(package = name.as_str(), range = range.as_str(), version = version.as_str(), "resolved");
        Ok::<_, FetchError>((name.clone(), version))
    }))
    .await?;

    Ok(resolved.into_iter().collect())
}

/// Registry document for one package; only the parts resolution needs
#[derive(Debug, Default, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    versions: BTreeMap<String, IgnoredAny>,
}

/// Resolves ranges against an npm-style registry.
///
/// Exact versions and non-registry specifiers (URLs, `github:` shorthands)
/// are returned without a request.
pub struct RegistryResolver {
    backend: Arc<dyn PackagerBackend>,
    registry_url: String,
}

impl RegistryResolver {
    pub fn new(backend: Arc<dyn PackagerBackend>, registry_url: impl Into<String>) -> Self {
        Self {
            backend,
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn packument_url(&self, name: &str) -> String {
        format!("{}/{}", self.registry_url, name.replace('/', "%2F"))
    }
}

#[async_trait]
impl VersionResolver for RegistryResolver {
    async fn resolve(&self, name: &str, range: &str) -> Result<String, FetchError> {
        if let Ok(version) = Version::parse(range.strip_prefix('v').unwrap_or(range)) {
            return Ok(version.to_string());
        }
        if range.contains(':') || range.contains('/') {
            return Ok(range.to_string());
        }

        let error = |message: String| FetchError::Resolution {
            name: name.to_string(),
            range: range.to_string(),
            message,
        };

        let url = self.packument_url(name);
        let response = self.backend.request(Method::Get, &url).await?;
        if !response.is_success() {
            return Err(error(response.error_message()));
        }
        let packument: Packument = response.json(&url)?;

        let tag = if range.is_empty() { "latest" } else { range };
        if let Some(version) = packument.dist_tags.get(tag) {
            return Ok(version.clone());
        }

        let requirements = parse_range(range).map_err(|err| error(err.to_string()))?;
        max_satisfying(packument.versions.keys().map(String::as_str), &requirements)
            .map(|version| version.to_string())
            .ok_or_else(|| error("no matching version".to_string()))
    }
}

/// Parses an npm range into alternatives that each must hold as a whole.
///
/// Supports `||`, space separated comparator sets, hyphen ranges, `x`/`*`
/// wildcards and bare (exact or partial) versions.
pub fn parse_range(range: &str) -> Result<Vec<VersionReq>, semver::Error> {
    range.split("||").map(parse_comparator_set).collect()
}

fn parse_comparator_set(set: &str) -> Result<VersionReq, semver::Error> {
    let set = set.trim();
    if set.is_empty() {
        return Ok(VersionReq::STAR);
    }

    if let Some((low, high)) = set.split_once(" - ") {
        return VersionReq::parse(&format!(">={}, <={}", low.trim(), high.trim()));
    }

    let mut comparators: Vec<String> = Vec::new();
    let mut pending_operator = String::new();
    for token in set.split_whitespace() {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_operator.push_str(token);
            continue;
        }
        let token = format!("{}{}", std::mem::take(&mut pending_operator), token);
        comparators.push(npm_comparator(&token));
    }

    VersionReq::parse(&comparators.join(", "))
}

/// A bare npm version means exactly that version (or that partial range).
fn npm_comparator(token: &str) -> String {
    let token = token.strip_prefix('v').unwrap_or(token);
    let is_bare = token.starts_with(|c: char| c.is_ascii_digit());
    let is_wildcard = token.contains(['x', 'X', '*']);
    if is_bare && !is_wildcard {
        format!("={}", token)
    } else {
        token.to_string()
    }
}

/// Highest of `versions` satisfying any of `requirements`.
pub fn max_satisfying<'a>(
    versions: impl IntoIterator<Item = &'a str>,
    requirements: &[VersionReq],
) -> Option<Version> {
    versions
        .into_iter()
        .filter_map(|version| Version::parse(version).ok())
        .filter(|version| requirements.iter().any(|req| req.matches(version)))
        .max()
}

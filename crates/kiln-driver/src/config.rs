//! `kiln.toml` loading and validation

use std::path::Path;
use std::time::Duration;

use kiln_packager::{
    PackagerConfig, RetryPolicy, DEFAULT_BUCKET_URL, DEFAULT_BUILDING_STATUSES, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_PACKAGER_URL, DEFAULT_REGISTRY_URL, DEFAULT_SCHEMA_VERSION,
};
use kiln_worker::{PoolOptions, TranspileConfig, DEFAULT_DEPENDENCY_ROOT, DEFAULT_WORKER_COUNT};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "kiln.toml";

/// Errors that can occur when loading or validating a `kiln.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KilnConfig {
    pub packager: PackagerSection,
    pub workers: WorkersSection,
    pub transpile: TranspileSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerSection {
    pub bucket_url: String,
    pub packager_url: String,
    pub registry_url: String,
    pub schema_version: u32,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub building_statuses: Vec<u16>,
}

impl Default for PackagerSection {
    fn default() -> Self {
        Self {
            bucket_url: DEFAULT_BUCKET_URL.to_string(),
            packager_url: DEFAULT_PACKAGER_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: 2000,
            building_statuses: DEFAULT_BUILDING_STATUSES.to_vec(),
        }
    }
}

impl PackagerSection {
    pub fn packager_config(&self) -> PackagerConfig {
        PackagerConfig {
            bucket_url: self.bucket_url.trim_end_matches('/').to_string(),
            packager_url: self.packager_url.trim_end_matches('/').to_string(),
            registry_url: self.registry_url.clone(),
            schema_version: self.schema_version,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
            building_statuses: self.building_statuses.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersSection {
    pub count: usize,
    pub poll_interval_ms: u64,
    /// Workers started ahead of the first task
    pub prewarm: usize,
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            count: DEFAULT_WORKER_COUNT,
            poll_interval_ms: 50,
            prewarm: 0,
        }
    }
}

impl WorkersSection {
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            capacity: self.count,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileSection {
    pub dependency_root: String,
    pub strict_mode: bool,
}

impl Default for TranspileSection {
    fn default() -> Self {
        Self {
            dependency_root: DEFAULT_DEPENDENCY_ROOT.to_string(),
            strict_mode: true,
        }
    }
}

impl TranspileSection {
    pub fn transpile_config(&self) -> TranspileConfig {
        TranspileConfig {
            strict_mode: self.strict_mode,
            ..TranspileConfig::default()
        }
    }
}

/// Loads `<project_dir>/kiln.toml`, or the defaults if there is none.
pub fn load_config(project_dir: &Path) -> Result<KilnConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(KilnConfig::default());
    }
    load_config_file(&config_path)
}

pub fn load_config_file(path: &Path) -> Result<KilnConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` from a string.
pub fn load_config_from_str(content: &str) -> Result<KilnConfig, ConfigError> {
    let config: KilnConfig = toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &KilnConfig) -> Result<(), ConfigError> {
    let urls = [
        ("packager.bucket_url", &config.packager.bucket_url),
        ("packager.packager_url", &config.packager.packager_url),
        ("packager.registry_url", &config.packager.registry_url),
    ];
    for (field, url) in urls {
        if url.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} must not be empty", field)));
        }
    }
    if config.packager.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "packager.max_attempts must be at least 1".to_string(),
        ));
    }
    if config.workers.count == 0 {
        return Err(ConfigError::ValidationError("workers.count must be at least 1".to_string()));
    }
    if config.transpile.dependency_root.is_empty() {
        return Err(ConfigError::ValidationError(
            "transpile.dependency_root must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, KilnConfig::default());
        assert_eq!(config.packager.retry_policy(), RetryPolicy::default());
        assert_eq!(config.workers.count, 3);
        assert_eq!(config.transpile.dependency_root, "/node_modules");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[packager]
bucket_url = "https://bucket.example.com/"
packager_url = "https://packager.example.com/packages"
registry_url = "https://registry.example.com"
schema_version = 2
max_attempts = 10
retry_delay_ms = 500
building_statuses = [403]

[workers]
count = 4
poll_interval_ms = 20
prewarm = 2

[transpile]
dependency_root = "/deps"
strict_mode = false
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.packager.packager_config().bucket_url, "https://bucket.example.com");
        assert_eq!(config.packager.packager_config().schema_version, 2);
        let policy = config.packager.retry_policy();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert_eq!(policy.building_statuses, vec![403]);
        assert_eq!(config.workers.pool_options().capacity, 4);
        assert_eq!(config.workers.prewarm, 2);
        assert!(!config.transpile.transpile_config().strict_mode);
    }

    #[test]
    fn reject_zero_attempts() {
        let err = load_config_from_str("[packager]\nmax_attempts = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: packager.max_attempts must be at least 1"
        );
    }

    #[test]
    fn reject_zero_workers() {
        assert!(matches!(
            load_config_from_str("[workers]\ncount = 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn reject_empty_url() {
        let err = load_config_from_str("[packager]\nbucket_url = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("packager.bucket_url"));
    }

    #[test]
    fn reject_malformed_toml() {
        assert!(matches!(
            load_config_from_str("[workers\ncount = 1"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()).unwrap(), KilnConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "[workers]\ncount = 7\n").unwrap();
        assert_eq!(load_config(dir.path()).unwrap().workers.count, 7);
    }
}

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineError;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// HTTP API port.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Admission control and write workers.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Storage backend.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            ingest: IngestConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_api_port() -> u16 {
    9300
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Sustained ceiling of write submissions, points per second.
    #[serde(default = "default_request_limit")]
    pub request_limit: f64,

    /// Time for an idle limiter to ramp up to `request_limit`.
    /// Zero switches to a bursty bucket with no warmup.
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    /// Size of the worker pool that runs writes and their completions.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            request_limit: default_request_limit(),
            warmup_secs: default_warmup_secs(),
            worker_threads: default_worker_threads(),
        }
    }
}

fn default_request_limit() -> f64 {
    30_000.0
}

fn default_warmup_secs() -> u64 {
    180
}

fn default_worker_threads() -> usize {
    4
}

impl IngestConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.request_limit.is_finite() || self.request_limit <= 0.0 {
            return Err(EngineError::Config(format!(
                "ingest.request_limit must be a positive number, got {}",
                self.request_limit
            )));
        }
        if self.worker_threads == 0 {
            return Err(EngineError::Config(
                "ingest.worker_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Storage backend name. Only `memory` ships with the server.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Per-series cap for the memory backend; oldest points are evicted first.
    #[serde(default = "default_max_points_per_series")]
    pub max_points_per_series: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            max_points_per_series: default_max_points_per_series(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".into()
}

fn default_max_points_per_series() -> usize {
    100_000
}

/// Pluggable config file format, selected by file extension.
pub trait ConfigParser: Send + Sync {
    fn extensions(&self) -> &[&str];

    fn parse(&self, content: &str) -> Result<MetricsConfig, EngineError>;
}

pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn parse(&self, content: &str) -> Result<MetricsConfig, EngineError> {
        MetricsConfig::parse(content)
    }
}

impl MetricsConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        Self::load_with(Path::new(path), &[&TomlParser])
    }

    /// Load configuration, picking the parser whose extensions match `path`.
    pub fn load_with(path: &Path, parsers: &[&dyn ConfigParser]) -> Result<Self, EngineError> {
        let display = path.display();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let parser = parsers
            .iter()
            .find(|p| p.extensions().contains(&ext.as_str()))
            .ok_or_else(|| EngineError::UnsupportedFormat(format!("{display}: '.{ext}'")))?;

        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{display}: {e}")))?;
        let config = parser.parse(&content).map_err(|e| e.with_context(&display))?;
        config.ingest.validate().map_err(|e| e.with_context(&display))?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))
    }
}

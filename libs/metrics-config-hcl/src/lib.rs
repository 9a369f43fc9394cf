use metrics_engine::config::{ConfigParser, MetricsConfig};
use metrics_engine::error::EngineError;

/// Reads `.hcl` configuration files.
pub struct HclParser;

impl ConfigParser for HclParser {
    fn extensions(&self) -> &[&str] {
        &["hcl"]
    }

    fn parse(&self, content: &str) -> Result<MetricsConfig, EngineError> {
        hcl::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }
}

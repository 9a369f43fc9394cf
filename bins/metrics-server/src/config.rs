use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use metrics_config_hcl::HclParser;
use metrics_engine::{MetricsConfig, TomlParser};

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "metrics-server", about = "Rate-limited time-series metrics ingestion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the ingestion server
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to a TOML or HCL config file. Built-in defaults when omitted.
    #[arg(long, env = "METRICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Admission ceiling in points per second, overrides `ingest.request_limit`.
    #[arg(long, env = "METRICS_REQUEST_LIMIT")]
    pub request_limit: Option<f64>,

    /// HTTP API port, overrides `api_port`.
    #[arg(long, env = "METRICS_API_PORT")]
    pub port: Option<u16>,
}

impl ServeArgs {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<MetricsConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => MetricsConfig::load_with(path, &[&TomlParser, &HclParser])?,
            None => MetricsConfig::default(),
        };
        if let Some(limit) = self.request_limit {
            config.ingest.request_limit = limit;
        }
        if let Some(port) = self.port {
            config.api_port = port;
        }
        config.ingest.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Serve(args) => args,
        }
    }

    #[test]
    fn defaults_without_config_file() {
        let config = serve_args(&["metrics-server", "serve"])
            .resolve_config()
            .unwrap();
        assert_eq!(config.ingest.request_limit, 30_000.0);
        assert_eq!(config.ingest.worker_threads, 4);
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.toml");
        std::fs::write(&path, "api_port = 7000\n[ingest]\nrequest_limit = 10.0\n").unwrap();

        let config = serve_args(&[
            "metrics-server",
            "serve",
            "--config",
            path.to_str().unwrap(),
            "--request-limit",
            "2500",
        ])
        .resolve_config()
        .unwrap();

        assert_eq!(config.api_port, 7000);
        assert_eq!(config.ingest.request_limit, 2500.0);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = serve_args(&["metrics-server", "serve", "--request-limit", "0"])
            .resolve_config()
            .unwrap_err();
        assert!(matches!(err, ServerError::Engine(_)));
    }
}

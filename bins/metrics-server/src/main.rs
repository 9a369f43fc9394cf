mod config;
mod error;

use clap::Parser;
use config::{Cli, Commands};

mod cmd;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => cmd::serve::run(args),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "metrics-server failed");
        std::process::exit(1);
    }
}

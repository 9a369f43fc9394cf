use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use metrics_api::MetricsService;
use metrics_engine::{IngestService, MetricsConfig};
use storage_memory::MemoryStorage;

use crate::config::ServeArgs;
use crate::error::ServerError;

/// How often expired points are reclaimed from the memory backend.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub fn run(args: ServeArgs) -> Result<(), ServerError> {
    let config = args.resolve_config()?;
    tracing::info!(
        config = ?args.config,
        api_port = config.api_port,
        workers = config.ingest.worker_threads,
        "loaded config"
    );

    // Writes, their completions and the API all run on this fixed pool.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.ingest.worker_threads)
        .thread_name("metrics-worker")
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(serve(config))
}

async fn serve(config: MetricsConfig) -> Result<(), ServerError> {
    if config.storage.backend != "memory" {
        return Err(ServerError::UnsupportedBackend(config.storage.backend.clone()));
    }
    let storage = Arc::new(MemoryStorage::new(config.storage.max_points_per_series));
    tracing::info!(
        backend = %config.storage.backend,
        max_points_per_series = config.storage.max_points_per_series,
        "storage ready"
    );

    let service = Arc::new(IngestService::from_config(
        &config.ingest,
        storage.clone(),
        Handle::current(),
    )?);

    let token = CancellationToken::new();

    let purge = tokio::spawn({
        let storage = storage.clone();
        let token = token.clone();
        async move {
            let mut ticker = tokio::time::interval(PURGE_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        storage.purge_expired().await;
                    }
                    _ = token.cancelled() => break,
                }
            }
        }
    });

    let api_service: Arc<dyn MetricsService> = service.clone();
    let mut api = tokio::spawn(metrics_api_server::run(
        config.api_port,
        api_service,
        token.clone(),
    ));

    tracing::info!("metrics-server started, press Ctrl+C to stop");

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down...");
            signal.map_err(ServerError::Signal)
        }
        served = &mut api => {
            match served {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ServerError::Api(e)),
                Err(e) => Err(ServerError::Api(std::io::Error::other(e))),
            }
        }
    };

    // Batches still waiting return now; their writes finish in the background.
    service.interrupt();
    token.cancel();

    if !api.is_finished() {
        let _ = api.await;
    }
    let _ = purge.await;

    tracing::info!("stopped");
    result
}

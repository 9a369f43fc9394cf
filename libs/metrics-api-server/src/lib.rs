mod http;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;

use metrics_api::MetricsService;

#[derive(Clone)]
pub(crate) struct AppState {
    service: Arc<dyn MetricsService>,
}

/// Routes of the metrics HTTP API.
pub fn router(service: Arc<dyn MetricsService>) -> Router {
    Router::new()
        .route("/api/metrics", post(http::handle_add_data))
        .route("/api/series/{bucket}/{id}", get(http::handle_find_data))
        .route("/api/ids/{id}", get(http::handle_find_data_by_id))
        .route("/api/ids/{id}/exists", get(http::handle_id_exists))
        .with_state(AppState { service })
}

/// Serve the metrics HTTP API until `shutdown` fires.
pub async fn run(
    port: u16,
    service: Arc<dyn MetricsService>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "metrics api listening");

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use metrics_api::RawDataPoint;

use super::AppState;

// ═══════════════════════════════════════════════════════════════
//  REST: POST /api/metrics
// ═══════════════════════════════════════════════════════════════

/// Responds once the whole batch is accounted for. Individual write
/// failures are not reported back.
pub(crate) async fn handle_add_data(
    State(state): State<AppState>,
    axum::Json(points): axum::Json<Vec<RawDataPoint>>,
) -> impl IntoResponse {
    state.service.add_data(&points).await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub(crate) struct RangeParams {
    start: Option<i64>,
    end: Option<i64>,
}

impl RangeParams {
    fn bounds(&self) -> (i64, i64) {
        (self.start.unwrap_or(0), self.end.unwrap_or(i64::MAX))
    }
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/series/{bucket}/{id}?start=&end=
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_find_data(
    State(state): State<AppState>,
    Path((bucket, id)): Path<(String, String)>,
    Query(params): Query<RangeParams>,
) -> impl IntoResponse {
    let (start, end) = params.bounds();
    match state.service.find_data(&bucket, &id, start, end).await {
        Ok(points) => axum::Json(points).into_response(),
        Err(e) => {
            tracing::warn!(%bucket, %id, error = %e, "range read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {e}")).into_response()
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/ids/{id}?start=&end=
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_find_data_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RangeParams>,
) -> impl IntoResponse {
    let (start, end) = params.bounds();
    axum::Json(state.service.find_data_by_id(&id, start, end))
}

// ═══════════════════════════════════════════════════════════════
//  REST: GET /api/ids/{id}/exists
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_id_exists(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    axum::Json(serde_json::json!({ "exists": state.service.id_exists(&id) }))
}

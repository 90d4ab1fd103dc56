//! Route table for the Observer API.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use crate::ws::ws_days;

/// Build the Observer API router.
///
/// Routes:
/// - `GET /healthz` -- liveness probe.
/// - `GET /snapshot` -- the latest day-consistent snapshot.
/// - `GET /ws/days` -- the live feed.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/snapshot", get(snapshot))
        .route("/ws/days", get(ws_days))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// The latest committed snapshot, or 503 before the first commit.
async fn snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.snapshot().await.map_or_else(
        || (StatusCode::SERVICE_UNAVAILABLE, "no day committed yet").into_response(),
        |snapshot| Json(snapshot).into_response(),
    )
}

//! Cold-start status endpoint

use axum::{extract::State, routing::get, Json, Router};
use onair_common::api::StatusView;

use crate::AppState;

/// GET /api/status
///
/// Current station status as held by the status cell. Before the first
/// successful poll `status` is `null` and `now_playing` is `"unknown"`.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusView> {
    Json(state.status.state().to_view(&state.station_id))
}

pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/status", get(get_status))
}

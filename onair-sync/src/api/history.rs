use axum::{extract::State, routing::get, Json, Router};
use onair_common::api::HistoryResponse;

use crate::AppState;

/// GET /api/history - trailing transition log, newest first
pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        entries: state.history.recent().await,
    })
}

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/api/history", get(get_history))
}

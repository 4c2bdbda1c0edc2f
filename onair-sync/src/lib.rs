//! onair-sync library interface
//!
//! Polls a hosted radio station for its status, derives transitions from
//! consecutive snapshots and pushes them to connected clients over SSE.

pub mod api;
pub mod cell;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod notifier;
pub mod poller;
pub mod source;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use cell::StatusReader;
use history::TransitionLog;
use onair_common::db::DeviceStore;
use onair_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub station_id: String,
    /// Read half of the status cell
    pub status: StatusReader,
    /// Client push registry
    pub bus: EventBus,
    pub history: TransitionLog,
    pub devices: DeviceStore,
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::status_routes())
        .merge(api::history_routes())
        .merge(api::device_routes())
        .route("/api/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Push-notification device registration

use crate::{ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use onair_common::api::{DeviceInfo, DeviceRegistration};
use tracing::info;

/// POST /api/devices
///
/// **Request:** `{"token": "...", "platform": "ios"}`
///
/// **Errors:**
/// - 400 Bad Request: empty or oversized token
pub async fn register_device(
    State(state): State<AppState>,
    Json(payload): Json<DeviceRegistration>,
) -> ApiResult<(StatusCode, Json<DeviceInfo>)> {
    let device = state
        .devices
        .register(&payload.token, payload.platform.as_deref())
        .await?;
    info!(platform = ?device.platform, "Device registered");
    Ok((StatusCode::CREATED, Json(device)))
}

/// DELETE /api/devices/:token
pub async fn unregister_device(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<StatusCode> {
    state.devices.unregister(&token).await?;
    info!("Device unregistered");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> ApiResult<Json<Vec<DeviceInfo>>> {
    Ok(Json(state.devices.list().await?))
}

pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/api/devices", get(list_devices).post(register_device))
        .route("/api/devices/:token", delete(unregister_device))
}

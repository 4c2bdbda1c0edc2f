use crate::error::FailureKind;
use crate::events::TransitionKind;
use crate::status::StationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Current station status as seen by the sync service
///
/// Returned by the cold-start endpoint and sent as the `Snapshot` event on
/// every new push connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub station_id: String,
    /// Last known good snapshot; `None` until the first successful poll
    pub status: Option<StationStatus>,
    /// `playing`, `no_track_info`, `offline` or `unknown`
    pub now_playing: String,
    /// True when the most recent poll failed
    pub stale: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<FailureKind>,
    pub last_success: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

impl StatusView {
    pub fn new(
        station_id: impl Into<String>,
        status: Option<StationStatus>,
        consecutive_failures: u32,
        last_error: Option<FailureKind>,
    ) -> Self {
        let now_playing = status
            .as_ref()
            .map(|s| s.now_playing().label())
            .unwrap_or("unknown")
            .to_string();
        let last_success = status.as_ref().map(|s| s.fetched_at);
        Self {
            station_id: station_id.into(),
            status,
            now_playing,
            stale: consecutive_failures > 0,
            consecutive_failures,
            last_error,
            last_success,
            timestamp: Utc::now(),
        }
    }
}

/// One entry of the trailing transition log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: TransitionKind,
    pub summary: String,
    pub track_title: Option<String>,
    pub collaborator: Option<String>,
    pub at: DateTime<Utc>,
}

/// GET /api/history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
}

/// POST /api/devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRegistration {
    pub token: String,
    #[serde(default)]
    pub platform: Option<String>,
}

/// Registered push-notification device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub token: String,
    pub platform: Option<String>,
    pub registered_at: DateTime<Utc>,
}

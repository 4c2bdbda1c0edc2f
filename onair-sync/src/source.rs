//! Remote station source client
//!
//! Fetches station status from the hosted radio API and normalizes the
//! response into a [`StationStatus`] snapshot.
//!
//! Endpoints:
//! - `GET {base}/stations/{id}/status`
//! - `GET {base}/api/v2/{id}/track/current`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_common::{Error, OnlineState, Result, SourceMode, StationStatus, Track};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("onair-sync/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce a station status snapshot
///
/// Errors must be `UpstreamUnavailable` or `MalformedResponse`; the poller
/// treats both as soft failures.
#[async_trait]
pub trait StationSource: Send + Sync {
    /// Fetch and normalize the current status
    async fn fetch_status(&self) -> Result<StationStatus>;
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    source: Option<WireSource>,
    #[serde(default)]
    current_track: Option<WireTrack>,
    #[serde(default)]
    history: Vec<WireHistoryItem>,
    #[serde(default)]
    outputs: Vec<WireOutput>,
    #[serde(default, alias = "listener_count")]
    listeners: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    collaborator: Option<WireCollaborator>,
}

/// The collaborator is either a bare name or an object carrying one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireCollaborator {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
    },
}

impl WireCollaborator {
    fn into_name(self) -> Option<String> {
        let name = match self {
            WireCollaborator::Name(name) => Some(name),
            WireCollaborator::Object { name } => name,
        };
        name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    artwork_url: Option<String>,
}

impl WireTrack {
    /// `None` for an empty title: the upstream sends blank tracks during dead air
    fn into_track(self) -> Option<Track> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        Some(Track {
            title,
            artwork_url: self.artwork_url.filter(|u| !u.is_empty()),
            start_time: self.start_time,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireHistoryItem {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOutput {
    #[serde(default)]
    bitrate: Option<u32>,
}

/// `/track/current` is served either bare or wrapped in `data`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CurrentTrackResponse {
    Wrapped { data: WireTrack },
    Bare(WireTrack),
}

/// Normalize a raw status body
///
/// Exposed separately from the HTTP client so snapshots can be built from
/// recorded responses.
pub fn parse_status(station_id: &str, body: &str) -> Result<StationStatus> {
    let wire: StatusResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("status body: {}", e)))?;
    normalize(station_id, wire, Utc::now())
}

fn normalize(station_id: &str, wire: StatusResponse, fetched_at: DateTime<Utc>) -> Result<StationStatus> {
    let online_state = match wire.status.as_str() {
        "online" => OnlineState::Online,
        "offline" => OnlineState::Offline,
        other => {
            return Err(Error::MalformedResponse(format!(
                "unknown station status '{}'",
                other
            )))
        }
    };

    let (source_mode, collaborator) = match wire.source {
        None => (SourceMode::Automated, None),
        Some(source) => match source.kind.as_str() {
            "live" => (
                SourceMode::Live,
                source.collaborator.and_then(WireCollaborator::into_name),
            ),
            "automated" | "relay" => (SourceMode::Automated, None),
            other => {
                return Err(Error::MalformedResponse(format!(
                    "unknown source type '{}'",
                    other
                )))
            }
        },
    };

    let recent_titles = wire
        .history
        .into_iter()
        .filter_map(|item| item.title)
        .filter(|title| !title.is_empty())
        .collect();

    Ok(StationStatus {
        station_id: station_id.to_string(),
        online_state,
        source_mode,
        current_track: wire.current_track.and_then(WireTrack::into_track),
        bitrate: wire.outputs.first().and_then(|o| o.bitrate),
        listener_count: wire.listeners.unwrap_or(0),
        collaborator,
        recent_titles,
        fetched_at,
    })
}

// ============================================================================
// HTTP client
// ============================================================================

/// HTTP client for one station at the hosted radio API
#[derive(Debug, Clone)]
pub struct RadioCoClient {
    http_client: reqwest::Client,
    base_url: String,
    station_id: String,
}

impl RadioCoClient {
    pub fn new(base_url: &str, station_id: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            station_id: station_id.to_string(),
        })
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn status_url(&self) -> String {
        format!("{}/stations/{}/status", self.base_url, self.station_id)
    }

    pub fn current_track_url(&self) -> String {
        format!("{}/api/v2/{}/track/current", self.base_url, self.station_id)
    }

    async fn get_body(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching from station source");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!("HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| Error::UpstreamUnavailable(format!("reading body: {}", e)))
    }

    /// Fetch the current track from the dedicated endpoint
    ///
    /// Returns `Ok(None)` when the upstream reports no track (dead air).
    pub async fn current_track(&self) -> Result<Option<Track>> {
        let body = self.get_body(&self.current_track_url()).await?;
        let parsed: CurrentTrackResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("current track body: {}", e)))?;
        let wire = match parsed {
            CurrentTrackResponse::Wrapped { data } => data,
            CurrentTrackResponse::Bare(track) => track,
        };
        Ok(wire.into_track())
    }
}

#[async_trait]
impl StationSource for RadioCoClient {
    async fn fetch_status(&self) -> Result<StationStatus> {
        let body = self.get_body(&self.status_url()).await?;
        parse_status(&self.station_id, &body)
    }
}

//! Event types for the onair event system
//!
//! Provides transition definitions and the [`EventBus`] used to fan events out
//! to connected clients.

mod bus;

pub use bus::{DeliveryReport, EventBus, Subscription, SubscriberId};

use crate::api::StatusView;
use crate::error::FailureKind;
use crate::status::StationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant of a [`TransitionEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    TrackChanged,
    WentLive,
    WentOffline,
    BackToAutomated,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::TrackChanged => "TrackChanged",
            TransitionKind::WentLive => "WentLive",
            TransitionKind::WentOffline => "WentOffline",
            TransitionKind::BackToAutomated => "BackToAutomated",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantically meaningful change between two consecutive snapshots
///
/// Produced by diffing snapshots in the poller and consumed exactly once by
/// the notifier. Serialized with an internal `type` tag for the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransitionEvent {
    /// Track identity (title + start time) changed
    TrackChanged {
        old: StationStatus,
        new: StationStatus,
    },

    /// Source switched from automated to live
    WentLive {
        /// Collaborator name, `None` for an anonymous live source
        collaborator: Option<String>,
        old: StationStatus,
        new: StationStatus,
    },

    /// Station stopped broadcasting
    WentOffline {
        old: StationStatus,
        new: StationStatus,
    },

    /// Source switched from live back to automated
    BackToAutomated {
        old: StationStatus,
        new: StationStatus,
    },
}

impl TransitionEvent {
    pub fn kind(&self) -> TransitionKind {
        match self {
            TransitionEvent::TrackChanged { .. } => TransitionKind::TrackChanged,
            TransitionEvent::WentLive { .. } => TransitionKind::WentLive,
            TransitionEvent::WentOffline { .. } => TransitionKind::WentOffline,
            TransitionEvent::BackToAutomated { .. } => TransitionKind::BackToAutomated,
        }
    }

    pub fn old(&self) -> &StationStatus {
        match self {
            TransitionEvent::TrackChanged { old, .. }
            | TransitionEvent::WentLive { old, .. }
            | TransitionEvent::WentOffline { old, .. }
            | TransitionEvent::BackToAutomated { old, .. } => old,
        }
    }

    pub fn new_status(&self) -> &StationStatus {
        match self {
            TransitionEvent::TrackChanged { new, .. }
            | TransitionEvent::WentLive { new, .. }
            | TransitionEvent::WentOffline { new, .. }
            | TransitionEvent::BackToAutomated { new, .. } => new,
        }
    }

    /// Whether the transition is forwarded to the push-notification service
    pub fn is_notification_worthy(&self) -> bool {
        matches!(self, TransitionEvent::WentLive { .. })
    }

    /// Short human readable description, used for the trailing log
    pub fn summary(&self) -> String {
        match self {
            TransitionEvent::TrackChanged { new, .. } => match &new.current_track {
                Some(track) => format!("Now playing: {}", track.title),
                None => "Track changed".to_string(),
            },
            TransitionEvent::WentLive { collaborator, .. } => match collaborator {
                Some(name) => format!("Live: {}", name),
                None => "Live broadcast started".to_string(),
            },
            TransitionEvent::WentOffline { .. } => "Station went offline".to_string(),
            TransitionEvent::BackToAutomated { .. } => "Back to automated playlist".to_string(),
        }
    }
}

/// Payload of a soft poll failure pushed to clients as a stale-data indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfoError {
    pub kind: FailureKind,
    pub message: String,
    pub consecutive_failures: u32,
    pub timestamp: DateTime<Utc>,
}

/// Everything that travels over the client push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StationEvent {
    /// Current status, sent as the first event on every connection
    Snapshot { view: StatusView },

    /// A detected transition
    Transition { transition: TransitionEvent },

    /// The last poll failed; the current status is stale
    StreamInfoError { error: StreamInfoError },
}

impl StationEvent {
    /// SSE `event:` field for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            StationEvent::Snapshot { .. } => "Snapshot",
            StationEvent::Transition { transition } => transition.kind().as_str(),
            StationEvent::StreamInfoError { .. } => "StreamInfoError",
        }
    }

    /// JSON body for the SSE `data:` field
    ///
    /// Only the inner payload is sent; the event name already carries the tag.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            StationEvent::Snapshot { view } => serde_json::to_string(view),
            StationEvent::Transition { transition } => serde_json::to_string(transition),
            StationEvent::StreamInfoError { error } => serde_json::to_string(error),
        }
    }

    /// Rebuild an event from an SSE `event:` name and `data:` body
    pub fn from_sse(event_type: &str, data: &str) -> serde_json::Result<Option<Self>> {
        let event = match event_type {
            "Snapshot" => StationEvent::Snapshot {
                view: serde_json::from_str(data)?,
            },
            "TrackChanged" | "WentLive" | "WentOffline" | "BackToAutomated" => {
                StationEvent::Transition {
                    transition: serde_json::from_str(data)?,
                }
            }
            "StreamInfoError" => StationEvent::StreamInfoError {
                error: serde_json::from_str(data)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::test_support::online_with;
    use crate::status::SourceMode;

    fn went_live() -> TransitionEvent {
        let old = online_with("A - B", "2024-05-01T12:00:00Z");
        let mut new = old.clone();
        new.source_mode = SourceMode::Live;
        new.collaborator = Some("DJ X".into());
        TransitionEvent::WentLive {
            collaborator: Some("DJ X".into()),
            old,
            new,
        }
    }

    #[test]
    fn test_transition_kind_and_accessors() {
        let event = went_live();
        assert_eq!(event.kind(), TransitionKind::WentLive);
        assert!(event.is_notification_worthy());
        assert!(!event.old().is_live());
        assert!(event.new_status().is_live());
        assert_eq!(event.summary(), "Live: DJ X");
    }

    #[test]
    fn test_transition_serializes_with_type_tag() {
        let json = serde_json::to_value(went_live()).unwrap();
        assert_eq!(json["type"], "WentLive");
        assert_eq!(json["collaborator"], "DJ X");
        assert_eq!(json["new"]["source_mode"], "live");
    }

    #[test]
    fn test_sse_payload_parses_back() {
        let event = StationEvent::Transition {
            transition: went_live(),
        };
        assert_eq!(event.event_type(), "WentLive");

        let data = event.payload_json().unwrap();
        let parsed = StationEvent::from_sse(event.event_type(), &data)
            .unwrap()
            .expect("known event type");
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_unknown_sse_event_is_ignored() {
        assert!(StationEvent::from_sse("ConnectionStatus", "connected")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_stream_info_error_event_type() {
        let event = StationEvent::StreamInfoError {
            error: StreamInfoError {
                kind: FailureKind::UpstreamUnavailable,
                message: "HTTP 500".into(),
                consecutive_failures: 2,
                timestamp: Utc::now(),
            },
        };
        assert_eq!(event.event_type(), "StreamInfoError");
        let json: serde_json::Value = serde_json::from_str(&event.payload_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "UpstreamUnavailable");
        assert_eq!(json["consecutive_failures"], 2);
    }
}

//! Station status snapshot model
//!
//! A [`StationStatus`] is one normalized poll result. Snapshots are immutable:
//! each successful poll builds a new one which supersedes the previous value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the station is broadcasting at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnlineState {
    Online,
    Offline,
}

/// Where the on-air audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Playlist / autopilot
    Automated,
    /// A collaborator is broadcasting live
    Live,
}

/// Currently playing track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub artwork_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl Track {
    /// Identity used for "song changed" detection: title + start time.
    ///
    /// Artwork is ignored; the upstream occasionally swaps artwork URLs for the
    /// same play.
    pub fn same_identity(&self, other: &Track) -> bool {
        self.title == other.title && self.start_time == other.start_time
    }
}

/// What a client should display for a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NowPlaying<'a> {
    Offline,
    /// Online, but the upstream gave no current track (dead air)
    NoTrackInfo,
    Playing(&'a Track),
}

impl NowPlaying<'_> {
    /// Stable lowercase label used in API payloads
    pub fn label(&self) -> &'static str {
        match self {
            NowPlaying::Offline => "offline",
            NowPlaying::NoTrackInfo => "no_track_info",
            NowPlaying::Playing(_) => "playing",
        }
    }
}

/// One polled snapshot of the remote station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationStatus {
    pub station_id: String,
    pub online_state: OnlineState,
    pub source_mode: SourceMode,
    pub current_track: Option<Track>,
    /// Bitrate of the primary output in kbps
    pub bitrate: Option<u32>,
    pub listener_count: u32,
    /// Live collaborator name; only ever set when `source_mode` is `Live`
    pub collaborator: Option<String>,
    /// Titles of recently played tracks, newest first
    #[serde(default)]
    pub recent_titles: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl StationStatus {
    pub fn is_online(&self) -> bool {
        self.online_state == OnlineState::Online
    }

    pub fn is_live(&self) -> bool {
        self.source_mode == SourceMode::Live
    }

    /// Resolve the display sub-state for this snapshot
    pub fn now_playing(&self) -> NowPlaying<'_> {
        if !self.is_online() {
            return NowPlaying::Offline;
        }
        match &self.current_track {
            Some(track) => NowPlaying::Playing(track),
            None => NowPlaying::NoTrackInfo,
        }
    }

    /// Track that participates in change detection.
    ///
    /// Offline snapshots never expose a track, whatever the upstream sent.
    pub fn comparable_track(&self) -> Option<&Track> {
        match self.now_playing() {
            NowPlaying::Playing(track) => Some(track),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn online_with(title: &str, start: &str) -> StationStatus {
        StationStatus {
            station_id: "s0123456789".to_string(),
            online_state: OnlineState::Online,
            source_mode: SourceMode::Automated,
            current_track: Some(Track {
                title: title.to_string(),
                artwork_url: None,
                start_time: Some(start.parse().unwrap()),
            }),
            bitrate: Some(128),
            listener_count: 3,
            collaborator: None,
            recent_titles: vec![],
            fetched_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::online_with;
    use super::*;

    #[test]
    fn test_track_identity_ignores_artwork() {
        let a = Track {
            title: "Artist - Song".into(),
            artwork_url: Some("https://img/a.jpg".into()),
            start_time: Some("2024-05-01T12:00:00Z".parse().unwrap()),
        };
        let b = Track {
            artwork_url: Some("https://img/b.jpg".into()),
            ..a.clone()
        };
        assert!(a.same_identity(&b));

        let replay = Track {
            start_time: Some("2024-05-01T12:04:00Z".parse().unwrap()),
            ..a.clone()
        };
        assert!(!a.same_identity(&replay));
    }

    #[test]
    fn test_now_playing_sub_states() {
        let mut status = online_with("A - B", "2024-05-01T12:00:00Z");
        assert!(matches!(status.now_playing(), NowPlaying::Playing(_)));

        status.current_track = None;
        assert_eq!(status.now_playing(), NowPlaying::NoTrackInfo);
        assert_eq!(status.now_playing().label(), "no_track_info");

        status.current_track = Some(Track {
            title: "stale".into(),
            artwork_url: None,
            start_time: None,
        });
        status.online_state = OnlineState::Offline;
        assert_eq!(status.now_playing(), NowPlaying::Offline);
        assert!(status.comparable_track().is_none());
    }

    #[test]
    fn test_status_serializes_lowercase_enums() {
        let status = online_with("A - B", "2024-05-01T12:00:00Z");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["online_state"], "online");
        assert_eq!(json["source_mode"], "automated");
        assert_eq!(json["current_track"]["title"], "A - B");
    }
}

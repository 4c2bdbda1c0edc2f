//! Client-side now-playing view model
//!
//! Mirrors the sync service's current status from a cold-start fetch, the
//! push channel and, when push is down, periodic polling.

use chrono::{DateTime, Utc};
use onair_common::api::StatusView;
use onair_common::events::{StationEvent, StreamInfoError, TransitionEvent, TransitionKind};
use onair_common::{FailureKind, NowPlaying, SourceMode, StationStatus};

/// How the view is currently kept up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// No data path established yet
    Connecting,
    /// Receiving pushed events
    Push,
    /// Push channel lost; polling the status endpoint
    Polling,
}

impl ConnectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionMode::Connecting => "connecting",
            ConnectionMode::Push => "push",
            ConnectionMode::Polling => "polling",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingView {
    pub status: Option<StationStatus>,
    /// The service reports its status as outdated, or we could not reach it
    pub stale: bool,
    pub last_error: Option<FailureKind>,
    pub mode: ConnectionMode,
    pub last_transition: Option<TransitionKind>,
    /// Summary of the last transition, e.g. "Live: DJ X"
    pub last_summary: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for NowPlayingView {
    fn default() -> Self {
        Self::new()
    }
}

impl NowPlayingView {
    pub fn new() -> Self {
        Self {
            status: None,
            stale: false,
            last_error: None,
            mode: ConnectionMode::Connecting,
            last_transition: None,
            last_summary: None,
            updated_at: None,
        }
    }

    /// Replace the view with a full status (cold start, snapshot, poll)
    pub fn apply_snapshot(&mut self, view: StatusView) {
        self.status = view.status;
        self.stale = view.stale;
        self.last_error = view.last_error;
        self.updated_at = Some(Utc::now());
    }

    /// Apply one pushed transition; the new status replaces the old one
    pub fn apply_transition(&mut self, transition: TransitionEvent) {
        self.last_transition = Some(transition.kind());
        self.last_summary = Some(transition.summary());
        self.status = Some(transition.new_status().clone());
        self.stale = false;
        self.last_error = None;
        self.updated_at = Some(Utc::now());
    }

    /// The service failed to refresh; keep the status, mark it stale
    pub fn apply_error(&mut self, error: StreamInfoError) {
        self.stale = true;
        self.last_error = Some(error.kind);
    }

    pub fn apply_event(&mut self, event: StationEvent) {
        match event {
            StationEvent::Snapshot { view } => self.apply_snapshot(view),
            StationEvent::Transition { transition } => self.apply_transition(transition),
            StationEvent::StreamInfoError { error } => self.apply_error(error),
        }
    }

    /// We could not reach the sync service at all
    pub fn mark_unreachable(&mut self) {
        self.stale = true;
    }

    /// One-line summary for terminal output
    pub fn render(&self) -> String {
        let body = match &self.status {
            None => "waiting for station status".to_string(),
            Some(status) => match status.now_playing() {
                NowPlaying::Offline => "station offline".to_string(),
                NowPlaying::NoTrackInfo => on_air(status, "no track info"),
                NowPlaying::Playing(track) => on_air(status, &track.title),
            },
        };

        let mut line = format!("[{}] {}", self.mode.label(), body);
        if let Some(status) = &self.status {
            if status.is_online() {
                line.push_str(&format!(" | {} listeners", status.listener_count));
            }
        }
        if self.stale {
            line.push_str(" (stale)");
        }
        line
    }
}

fn on_air(status: &StationStatus, what: &str) -> String {
    match (status.source_mode, status.collaborator.as_deref()) {
        (SourceMode::Live, Some(name)) => format!("LIVE with {}: {}", name, what),
        (SourceMode::Live, None) => format!("LIVE: {}", what),
        (SourceMode::Automated, _) => format!("now playing: {}", what),
    }
}

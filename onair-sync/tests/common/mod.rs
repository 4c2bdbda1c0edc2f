//! Shared fixtures for onair-sync integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use onair_common::{Error, OnlineState, Result, SourceMode, StationStatus, Track};
use onair_sync::source::StationSource;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const STATION: &str = "s0123456789";

/// Online, automated, playing `title`
pub fn playing(title: &str, start: &str) -> StationStatus {
    StationStatus {
        station_id: STATION.to_string(),
        online_state: OnlineState::Online,
        source_mode: SourceMode::Automated,
        current_track: Some(Track {
            title: title.to_string(),
            artwork_url: None,
            start_time: Some(start.parse().unwrap()),
        }),
        bitrate: Some(128),
        listener_count: 10,
        collaborator: None,
        recent_titles: vec![],
        fetched_at: Utc::now(),
    }
}

pub fn live(mut status: StationStatus, collaborator: Option<&str>) -> StationStatus {
    status.source_mode = SourceMode::Live;
    status.collaborator = collaborator.map(str::to_string);
    status
}

pub fn offline(mut status: StationStatus) -> StationStatus {
    status.online_state = OnlineState::Offline;
    status
}

pub fn http_500() -> Error {
    Error::UpstreamUnavailable("HTTP 500".to_string())
}

/// Station source replaying a fixed script of results
///
/// Once the script is exhausted the last successful status is repeated.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<VecDeque<Result<StationStatus>>>>,
    last_ok: Arc<Mutex<Option<StationStatus>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<StationStatus>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationSource for ScriptedSource {
    async fn fetch_status(&self) -> Result<StationStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(status)) => {
                *self.last_ok.lock().unwrap() = Some(status.clone());
                Ok(status)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last_ok
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::UpstreamUnavailable("script exhausted".to_string())),
        }
    }
}

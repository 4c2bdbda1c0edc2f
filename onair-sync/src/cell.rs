//! Single-writer cell holding the current station status
//!
//! The poller owns the only [`StatusWriter`]; API handlers and the SSE
//! baseline hold [`StatusReader`] clones. Every write replaces the whole
//! [`CellState`] at once, so readers never observe a half-updated value.

use chrono::{DateTime, Utc};
use onair_common::api::StatusView;
use onair_common::{FailureKind, StationStatus};
use std::sync::Arc;
use tokio::sync::watch;

/// Value stored in the cell
#[derive(Debug, Clone, Default)]
pub struct CellState {
    /// Last known good snapshot
    pub status: Option<Arc<StationStatus>>,
    /// Failed polls since the last success
    pub consecutive_failures: u32,
    pub last_error: Option<FailureKind>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl CellState {
    pub fn is_stale(&self) -> bool {
        self.consecutive_failures > 0
    }

    /// API/baseline view of this state
    pub fn to_view(&self, station_id: &str) -> StatusView {
        StatusView::new(
            station_id,
            self.status.as_deref().cloned(),
            self.consecutive_failures,
            self.last_error,
        )
    }
}

/// Create a cell, returning its only writer and a reader
pub fn status_cell() -> (StatusWriter, StatusReader) {
    let (tx, rx) = watch::channel(CellState::default());
    (StatusWriter { tx }, StatusReader { rx })
}

/// Write half; deliberately not `Clone`
#[derive(Debug)]
pub struct StatusWriter {
    tx: watch::Sender<CellState>,
}

impl StatusWriter {
    /// Install a new snapshot and clear the failure streak
    pub fn replace(&self, status: StationStatus) -> Arc<StationStatus> {
        let status = Arc::new(status);
        let installed = Arc::clone(&status);
        self.tx.send_replace(CellState {
            status: Some(installed),
            consecutive_failures: 0,
            last_error: None,
            last_failure_at: None,
        });
        status
    }

    /// Record a failed poll, keeping the last known status; returns the streak
    pub fn record_failure(&self, kind: FailureKind) -> u32 {
        let mut streak = 0;
        self.tx.send_modify(|state| {
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            state.last_error = Some(kind);
            state.last_failure_at = Some(Utc::now());
            streak = state.consecutive_failures;
        });
        streak
    }

    /// Copy of the current cell state
    pub fn state(&self) -> CellState {
        self.tx.borrow().clone()
    }

    /// Current snapshot as seen by the writer
    pub fn current(&self) -> Option<Arc<StationStatus>> {
        self.tx.borrow().status.clone()
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read half; cheap to clone
#[derive(Debug, Clone)]
pub struct StatusReader {
    rx: watch::Receiver<CellState>,
}

impl StatusReader {
    /// Copy of the current cell state
    pub fn state(&self) -> CellState {
        self.rx.borrow().clone()
    }

    pub fn current(&self) -> Option<Arc<StationStatus>> {
        self.rx.borrow().status.clone()
    }

    /// Wait until the cell is written again
    ///
    /// Returns `false` once the writer is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

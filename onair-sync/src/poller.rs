//! Status poller
//!
//! A single task fetches the station status on a fixed schedule, diffs it
//! against the current snapshot, installs the new snapshot and hands the
//! resulting transitions to the notifier.
//!
//! Failures are soft: the previous snapshot stays current, a
//! `StreamInfoError` condition is sent downstream and the next attempt
//! happens on the next regular tick. The first success after a failure
//! streak is sent downstream as `Recovered`, after any transitions it found.

use crate::cell::StatusWriter;
use crate::diff::diff;
use crate::source::StationSource;
use chrono::Utc;
use onair_common::api::StatusView;
use onair_common::config::MIN_POLL_INTERVAL_SECS;
use onair_common::events::{StreamInfoError, TransitionEvent};
use onair_common::FailureKind;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Message from the poller to the notifier, in production order
#[derive(Debug, Clone, PartialEq)]
pub enum PollerMessage {
    Transition(TransitionEvent),
    Failure(StreamInfoError),
    /// A poll succeeded after one or more failures; carries the fresh view
    Recovered(StatusView),
}

/// Result of one fetch-and-diff cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First successful poll; installed without transitions
    Baseline,
    /// Snapshot replaced, nothing worth reporting
    Unchanged,
    /// Snapshot replaced after a failure streak, without transitions
    Recovered,
    /// Snapshot replaced and this many transitions emitted
    Transitions(usize),
    /// Fetch failed; previous snapshot retained
    Failed(FailureKind),
}

/// Timer-driven poller for one station
pub struct Poller<S: StationSource> {
    source: S,
    writer: StatusWriter,
    tx: mpsc::Sender<PollerMessage>,
    interval: Duration,
}

impl<S: StationSource> Poller<S> {
    /// Create a poller; intervals under the upstream floor are raised to it
    pub fn new(
        source: S,
        writer: StatusWriter,
        tx: mpsc::Sender<PollerMessage>,
        interval: Duration,
    ) -> Self {
        let floor = Duration::from_secs(MIN_POLL_INTERVAL_SECS);
        let interval = if interval < floor {
            warn!(
                "Poll interval {:?} below upstream limit, using {:?}",
                interval, floor
            );
            floor
        } else {
            interval
        };

        Self {
            source,
            writer,
            tx,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one fetch-and-diff cycle
    pub async fn poll_once(&mut self) -> CycleOutcome {
        match self.source.fetch_status().await {
            Ok(status) => {
                let before = self.writer.state();
                let transitions = match before.status.as_deref() {
                    Some(old) => diff(old, &status),
                    None => Vec::new(),
                };

                let installed = self.writer.replace(status);
                let count = transitions.len();
                for transition in transitions {
                    info!(kind = %transition.kind(), "{}", transition.summary());
                    self.send(PollerMessage::Transition(transition)).await;
                }

                if before.is_stale() {
                    info!(
                        consecutive_failures = before.consecutive_failures,
                        "Station status poll recovered"
                    );
                    let view = self.writer.state().to_view(&installed.station_id);
                    self.send(PollerMessage::Recovered(view)).await;
                }

                match (before.status.is_none(), count, before.is_stale()) {
                    (true, _, _) => {
                        info!("Baseline station status installed");
                        CycleOutcome::Baseline
                    }
                    (false, 0, true) => CycleOutcome::Recovered,
                    (false, 0, false) => {
                        debug!("Station status unchanged");
                        CycleOutcome::Unchanged
                    }
                    (false, n, _) => CycleOutcome::Transitions(n),
                }
            }
            Err(e) => {
                let kind = e.failure_kind().unwrap_or(FailureKind::UpstreamUnavailable);
                let streak = self.writer.record_failure(kind);
                warn!(
                    kind = %kind,
                    consecutive_failures = streak,
                    "Station status poll failed: {}",
                    e
                );
                self.send(PollerMessage::Failure(StreamInfoError {
                    kind,
                    message: e.to_string(),
                    consecutive_failures: streak,
                    timestamp: Utc::now(),
                }))
                .await;
                CycleOutcome::Failed(kind)
            }
        }
    }

    async fn send(&self, message: PollerMessage) {
        if self.tx.send(message).await.is_err() {
            warn!("Notifier is gone, dropping poller message");
        }
    }

    /// Poll until `cancel` fires
    ///
    /// The first poll happens immediately. Cycles never overlap: the next tick
    /// is only awaited after the current cycle completed, and a late cycle
    /// delays the schedule instead of bursting.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Status poller started (interval {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => debug!(?outcome, "Poll cycle complete"),
            }
        }

        info!("Status poller stopped");
    }
}

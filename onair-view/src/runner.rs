//! Keeps a [`NowPlayingView`] current
//!
//! 1. Cold start: fetch `/api/status` once
//! 2. Open the push channel and apply events as they arrive
//! 3. When the channel drops, poll `/api/status` every interval and retry
//!    the push channel after each poll; a new connection re-baselines from
//!    its `Snapshot`

use crate::client::{EventStream, SyncClient};
use crate::view::{ConnectionMode, NowPlayingView};
use futures::StreamExt;
use onair_common::config::MIN_POLL_INTERVAL_SECS;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a push session ended
enum PushEnd {
    Lost,
    Cancelled,
}

pub struct ViewRunner {
    client: SyncClient,
    interval: Duration,
    view: NowPlayingView,
    tx: watch::Sender<NowPlayingView>,
}

impl ViewRunner {
    /// Create a runner and the receiver its view is published on
    ///
    /// The polling interval is subject to the same floor as the server's
    /// upstream polling.
    pub fn new(client: SyncClient, interval: Duration) -> (Self, watch::Receiver<NowPlayingView>) {
        let interval = interval.max(Duration::from_secs(MIN_POLL_INTERVAL_SECS));
        let view = NowPlayingView::new();
        let (tx, rx) = watch::channel(view.clone());
        (
            Self {
                client,
                interval,
                view,
                tx,
            },
            rx,
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn publish(&self) {
        self.tx.send_replace(self.view.clone());
    }

    async fn poll_status(&mut self) {
        match self.client.status().await {
            Ok(status) => self.view.apply_snapshot(status),
            Err(e) => {
                warn!("Status request failed: {}", e);
                self.view.mark_unreachable();
            }
        }
        self.publish();
    }

    async fn consume(&mut self, mut events: EventStream, cancel: &CancellationToken) -> PushEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PushEnd::Cancelled,
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    debug!("Received {} event", event.event_type());
                    self.view.apply_event(event);
                    self.publish();
                }
                Some(Err(e)) => {
                    warn!("Push channel error: {}", e);
                    return PushEnd::Lost;
                }
                None => {
                    warn!("Push channel closed by server");
                    return PushEnd::Lost;
                }
            }
        }
    }

    /// Run until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Following {}", self.client.base_url());
        self.poll_status().await;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.client.events().await {
                Ok(events) => {
                    if self.view.mode != ConnectionMode::Push {
                        info!("Push channel established");
                    }
                    self.view.mode = ConnectionMode::Push;
                    self.publish();

                    if let PushEnd::Cancelled = self.consume(events, &cancel).await {
                        break;
                    }
                }
                Err(e) => debug!("Push channel unavailable: {}", e),
            }

            if self.view.mode != ConnectionMode::Polling {
                info!("Falling back to polling every {:?}", self.interval);
            }
            self.view.mode = ConnectionMode::Polling;
            self.poll_status().await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!("View runner stopped");
    }
}

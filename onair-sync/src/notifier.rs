//! Change notifier
//!
//! Consumes poller messages in production order and fans them out: every
//! transition goes to the trailing log and to all connected clients, `WentLive`
//! additionally to the push-notification service. Push dispatch runs on its
//! own task so a slow push service never holds up client delivery.
//!
//! Poll failures reach clients as `StreamInfoError`; the first success after a
//! failure streak is sent as a fresh `Snapshot` so clients clear their stale
//! marker.

use crate::dispatch::{PushDispatcher, PushMessage};
use crate::history::TransitionLog;
use crate::poller::PollerMessage;
use onair_common::db::DeviceStore;
use onair_common::events::{DeliveryReport, EventBus, StationEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Notifier {
    bus: EventBus,
    history: TransitionLog,
    dispatcher: Arc<dyn PushDispatcher>,
    devices: Option<DeviceStore>,
    notification_title: Option<String>,
}

impl Notifier {
    pub fn new(bus: EventBus, history: TransitionLog, dispatcher: Arc<dyn PushDispatcher>) -> Self {
        Self {
            bus,
            history,
            dispatcher,
            devices: None,
            notification_title: None,
        }
    }

    /// Source of push tokens; without one, pushes go to an empty token set
    pub fn with_devices(mut self, devices: DeviceStore) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn with_notification_title(mut self, title: Option<String>) -> Self {
        self.notification_title = title;
        self
    }

    /// Handle one poller message
    ///
    /// Returns the push task spawned for a `WentLive`, if any, so callers
    /// (mainly tests) can wait for dispatch to finish.
    pub async fn handle(&self, message: PollerMessage) -> Option<JoinHandle<()>> {
        match message {
            PollerMessage::Transition(transition) => {
                self.history.record(&transition).await;
                let push = PushMessage::for_transition(&transition, self.notification_title.as_deref());

                let kind = transition.kind();
                let report = self.bus.emit(&StationEvent::Transition { transition });
                log_delivery(kind.as_str(), &report);

                push.map(|message| self.spawn_push(message))
            }
            PollerMessage::Failure(error) => {
                let report = self.bus.emit(&StationEvent::StreamInfoError { error });
                log_delivery("StreamInfoError", &report);
                None
            }
            PollerMessage::Recovered(view) => {
                let report = self.bus.emit(&StationEvent::Snapshot { view });
                log_delivery("Snapshot", &report);
                None
            }
        }
    }

    /// Send a push off the fan-out path
    fn spawn_push(&self, message: PushMessage) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let devices = self.devices.clone();

        tokio::spawn(async move {
            let tokens = match devices {
                Some(devices) => match devices.tokens().await {
                    Ok(tokens) => tokens,
                    Err(e) => {
                        error!("Failed to load push tokens: {}", e);
                        return;
                    }
                },
                None => Vec::new(),
            };

            if let Err(e) = dispatcher.send(&message, &tokens).await {
                warn!("Push notification failed: {}", e);
            }
        })
    }

    /// Consume messages until the poller is gone or `cancel` fires
    ///
    /// On exit every client channel is closed.
    pub async fn run(self, mut rx: mpsc::Receiver<PollerMessage>, cancel: CancellationToken) {
        info!("Change notifier started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = rx.recv() => match message {
                    Some(message) => {
                        self.handle(message).await;
                    }
                    None => {
                        debug!("Poller channel closed");
                        break;
                    }
                },
            }
        }

        self.bus.close_all();
        info!("Change notifier stopped");
    }
}

fn log_delivery(event: &str, report: &DeliveryReport) {
    for (subscriber, e) in &report.failures {
        warn!(subscriber = *subscriber, event, "{}", e);
    }
    debug!(event, delivered = report.delivered, failed = report.failed(), "Event fanned out");
}

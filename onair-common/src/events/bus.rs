//! Subscriber registry for client push channels
//!
//! Unlike a plain broadcast channel, every connected client owns an explicit
//! [`Subscription`] handle with its own bounded FIFO queue. Registration
//! happens on connection open and removal when the handle is dropped.

use super::StationEvent;
use crate::error::Error;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Identifier of one registered subscriber
pub type SubscriberId = u64;

struct Entry {
    tx: mpsc::Sender<StationEvent>,
    /// Set on shutdown; the stream ends without draining its queue
    closed: Arc<AtomicBool>,
}

struct Registry {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, Entry>,
}

/// Outcome of one publish
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Subscribers that got the event queued
    pub delivered: usize,
    /// Subscribers dropped because their queue was full or closed
    pub failures: Vec<(SubscriberId, Error)>,
}

impl DeliveryReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Central event distribution bus for connected clients
///
/// - Publishing never blocks: each queue is filled with `try_send`
/// - Ordering per subscriber matches publish order
/// - A subscriber whose queue is full is dropped from the registry; its
///   stream ends and the client reconnects to a fresh snapshot
///
/// # Examples
///
/// ```
/// use onair_common::events::EventBus;
///
/// let bus = EventBus::new(32);
/// let sub = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// drop(sub);
/// assert_eq!(bus.subscriber_count(), 0);
/// ```
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new bus
    ///
    /// # Arguments
    ///
    /// * `capacity` - Per-subscriber queue length. A client lagging this many
    ///   events behind is disconnected.
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 1,
                subscribers: HashMap::new(),
            })),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding the lock cannot leave the map half-updated
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a subscriber for all future events
    pub fn subscribe(&self) -> Subscription {
        self.register(None::<fn() -> StationEvent>)
    }

    /// Register a subscriber whose first event is `baseline()`
    ///
    /// The baseline is computed and queued while the registry lock is held,
    /// so no published event can be observed before it.
    pub fn subscribe_with<F>(&self, baseline: F) -> Subscription
    where
        F: FnOnce() -> StationEvent,
    {
        self.register(Some(baseline))
    }

    fn register<F>(&self, baseline: Option<F>) -> Subscription
    where
        F: FnOnce() -> StationEvent,
    {
        let (tx, rx) = mpsc::channel(self.capacity);
        let closed = Arc::new(AtomicBool::new(false));
        let mut registry = self.lock();

        if let Some(baseline) = baseline {
            // Fresh channel with capacity >= 1: cannot be full
            let _ = tx.try_send(baseline());
        }

        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(
            id,
            Entry {
                tx,
                closed: Arc::clone(&closed),
            },
        );
        debug!(subscriber = id, total = registry.subscribers.len(), "Subscriber registered");

        Subscription {
            id,
            rx,
            closed,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Publish an event to every subscriber
    ///
    /// Delivery failures are isolated: the failing subscriber is removed and
    /// reported as [`Error::ChannelDelivery`], and the remaining subscribers
    /// still receive the event. A removed subscriber keeps what it already
    /// had queued, then its stream ends.
    pub fn emit(&self, event: &StationEvent) -> DeliveryReport {
        let mut registry = self.lock();
        let mut report = DeliveryReport::default();

        for (id, entry) in registry.subscribers.iter() {
            match entry.tx.try_send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber = id,
                        event = event.event_type(),
                        "Client queue full, disconnecting slow subscriber"
                    );
                    report.failures.push((
                        *id,
                        Error::ChannelDelivery(format!("subscriber {} queue full", id)),
                    ));
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = id, "Client channel closed");
                    report.failures.push((
                        *id,
                        Error::ChannelDelivery(format!("subscriber {} channel closed", id)),
                    ));
                }
            }
        }

        for (id, _) in &report.failures {
            registry.subscribers.remove(id);
        }

        report
    }

    /// Current number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Drop every subscriber on shutdown
    ///
    /// Streams end at once; events still queued for a client are discarded.
    pub fn close_all(&self) {
        let mut registry = self.lock();
        let count = registry.subscribers.len();
        for (_, entry) in registry.subscribers.drain() {
            entry.closed.store(true, Ordering::Release);
        }
        debug!(count, "Closed all subscriber channels");
    }
}

/// Handle owned by one connected client
///
/// Yields events in publish order. Dropping the handle unregisters it.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<StationEvent>,
    closed: Arc<AtomicBool>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Receive the next event; `None` once the bus dropped this subscriber
    pub async fn recv(&mut self) -> Option<StationEvent> {
        futures::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Non-blocking receive, mainly for tests
    pub fn try_recv(&mut self) -> Option<StationEvent> {
        if self.is_closed() {
            return None;
        }
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = StationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // close_all drops the sender too, so a pending receiver is woken
        if self.is_closed() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if registry.subscribers.remove(&self.id).is_some() {
                debug!(subscriber = self.id, "Subscriber unregistered");
            }
        }
    }
}

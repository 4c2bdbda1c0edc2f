//! Server-Sent Events (SSE) utilities
//!
//! Converts [`StationEvent`]s into axum SSE frames and wraps a subscription
//! into a keep-alive SSE response.

use crate::events::{StationEvent, Subscription};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// Keep-alive comment interval
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Convert one station event into an SSE frame
///
/// Returns `None` if the payload cannot be serialized; the event is then
/// skipped for this client only.
pub fn to_sse_event(event: &StationEvent) -> Option<Event> {
    match event.payload_json() {
        Ok(json) => Some(Event::default().event(event.event_type()).data(json)),
        Err(e) => {
            warn!("Failed to serialize {} event: {}", event.event_type(), e);
            None
        }
    }
}

/// Build the SSE response for one connected client
///
/// The stream ends when the subscription is dropped by the bus (slow client
/// or shutdown); dropping the response unregisters the subscriber.
pub fn subscription_sse(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = subscription.id();
    debug!(subscriber = id, "SSE stream started");

    let stream = subscription.filter_map(|event| async move {
        debug!("Sending SSE event: {}", event.event_type());
        to_sse_event(&event).map(Ok)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

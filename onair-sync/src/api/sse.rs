//! Server-Sent Events push channel
//!
//! Every connection is registered with the event bus. Its first event is a
//! `Snapshot` of the current status, taken atomically with registration, so
//! no transition published after registration is lost.
//!
//! The poller installs a snapshot before its transitions reach the bus. A
//! client connecting in that window gets the new status as its baseline and
//! then the transition leading to it; applying a transition replaces the
//! whole status, so the repeat is harmless.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use onair_common::events::StationEvent;
use std::convert::Infallible;
use tracing::info;

/// GET /api/events - SSE stream of station events
///
/// Streams events:
/// - Snapshot (on connect, and again when the upstream recovers)
/// - TrackChanged
/// - WentLive
/// - WentOffline
/// - BackToAutomated
/// - StreamInfoError
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let reader = state.status.clone();
    let station_id = state.station_id.clone();

    let subscription = state.bus.subscribe_with(move || StationEvent::Snapshot {
        view: reader.state().to_view(&station_id),
    });
    info!(
        subscriber = subscription.id(),
        clients = state.bus.subscriber_count(),
        "New SSE client connected"
    );

    onair_common::sse::subscription_sse(subscription)
}

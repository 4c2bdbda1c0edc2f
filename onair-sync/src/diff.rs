//! Snapshot diffing
//!
//! Derives transitions purely from two consecutive snapshots. Rules:
//! - online → offline: `WentOffline`; nothing else is reported for an offline
//!   snapshot
//! - automated → live: `WentLive` (collaborator may be anonymous)
//! - live → automated: `BackToAutomated`
//! - track identity (title + start time) differs and the new snapshot has a
//!   track: `TrackChanged`
//!
//! Events are returned in that order. Listener count, bitrate, artwork and
//! history never trigger a transition.

use onair_common::events::TransitionEvent;
use onair_common::{SourceMode, StationStatus};

/// Compute the transitions between `old` and `new`
pub fn diff(old: &StationStatus, new: &StationStatus) -> Vec<TransitionEvent> {
    let mut events = Vec::new();

    if !new.is_online() {
        if old.is_online() {
            events.push(TransitionEvent::WentOffline {
                old: old.clone(),
                new: new.clone(),
            });
        }
        return events;
    }

    match (old.source_mode, new.source_mode) {
        (SourceMode::Automated, SourceMode::Live) => events.push(TransitionEvent::WentLive {
            collaborator: new.collaborator.clone(),
            old: old.clone(),
            new: new.clone(),
        }),
        (SourceMode::Live, SourceMode::Automated) => {
            events.push(TransitionEvent::BackToAutomated {
                old: old.clone(),
                new: new.clone(),
            })
        }
        _ => {}
    }

    if let Some(new_track) = new.comparable_track() {
        let changed = match old.comparable_track() {
            Some(old_track) => !old_track.same_identity(new_track),
            // coming back online, or leaving dead air
            None => true,
        };
        if changed {
            events.push(TransitionEvent::TrackChanged {
                old: old.clone(),
                new: new.clone(),
            });
        }
    }

    events
}

//! Bounded trailing log of recent transitions, for display only

use chrono::Utc;
use onair_common::api::HistoryEntry;
use onair_common::events::TransitionEvent;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct TransitionLog {
    entries: Arc<RwLock<VecDeque<HistoryEntry>>>,
    capacity: usize,
}

impl TransitionLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a transition, evicting the oldest entry when full
    pub async fn record(&self, event: &TransitionEvent) {
        let new = event.new_status();
        let entry = HistoryEntry {
            kind: event.kind(),
            summary: event.summary(),
            track_title: new.current_track.as_ref().map(|t| t.title.clone()),
            collaborator: new.collaborator.clone(),
            at: Utc::now(),
        };

        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Entries, newest first
    pub async fn recent(&self) -> Vec<HistoryEntry> {
        self.entries.read().await.iter().rev().cloned().collect()
    }
}

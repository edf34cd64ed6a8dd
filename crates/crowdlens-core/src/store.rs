// ── Alert / occupancy store ──
//
// Newest-first alert sequence plus the latest occupancy scalar. Every
// mutation publishes a fresh `Arc<FeedState>` through a `watch` channel so
// consumers can render the current snapshot or await the next change.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::watch;

use crate::model::CanonicalAlert;
use crate::stream::FeedStream;

/// Point-in-time view of the live feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Head is the most recent arrival.
    pub alerts: VecDeque<CanonicalAlert>,
    pub occupancy: f64,
}

impl FeedState {
    pub fn unread_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.dismissed).count()
    }
}

pub struct AlertStore {
    state: watch::Sender<Arc<FeedState>>,
}

impl Default for AlertStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(FeedState::default()));
        Self { state }
    }

    /// Prepend `alert`. Ids are not checked for duplicates.
    pub fn insert(&self, alert: CanonicalAlert) {
        self.state
            .send_modify(|s| Arc::make_mut(s).alerts.push_front(alert));
    }

    /// Remove the alert with `id`. Returns whether one was removed.
    pub fn dismiss(&self, id: &str) -> bool {
        self.state.send_if_modified(|s| {
            let Some(pos) = s.alerts.iter().position(|a| a.id == id) else {
                return false;
            };
            Arc::make_mut(s).alerts.remove(pos);
            true
        })
    }

    pub fn dismiss_all(&self) {
        self.state.send_modify(|s| Arc::make_mut(s).alerts.clear());
    }

    /// Flag the alert with `id` as seen without removing it.
    pub fn mark_seen(&self, id: &str) -> bool {
        self.state.send_if_modified(|s| {
            let Some(pos) = s.alerts.iter().position(|a| a.id == id && !a.dismissed) else {
                return false;
            };
            if let Some(alert) = Arc::make_mut(s).alerts.get_mut(pos) {
                alert.dismissed = true;
            }
            true
        })
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().unread_count()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().alerts.is_empty()
    }

    /// Alerts newest-first.
    pub fn alerts(&self) -> Vec<CanonicalAlert> {
        self.state.borrow().alerts.iter().cloned().collect()
    }

    /// Last write wins.
    pub fn set_occupancy(&self, value: f64) {
        self.state.send_if_modified(|s| {
            if s.occupancy.to_bits() == value.to_bits() {
                return false;
            }
            Arc::make_mut(s).occupancy = value;
            true
        });
    }

    pub fn occupancy(&self) -> f64 {
        self.state.borrow().occupancy
    }

    pub fn snapshot(&self) -> Arc<FeedState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> FeedStream {
        FeedStream::new(self.state.subscribe())
    }
}

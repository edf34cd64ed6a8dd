// ── Live feed session ──
//
// Owns the push-channel handle and fans inbound frames out to scoped
// subscriptions. Alerts are normalized against the current zone directory
// before a subscriber sees them; occupancy frames only get a shape check.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crowdlens_api::{PushConfig, PushFrame, PushHandle, PushKind, PushSignal, TransportKind};
use futures_core::Stream;
use secrecy::SecretString;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::directory::ReferenceDirectory;
use crate::error::CoreError;
use crate::model::{CanonicalAlert, OccupancyEvent};
use crate::normalize::{normalize, parse_occupancy};
use crate::state::ClientState;

/// Connection state of the live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// Transport backoff in progress; `attempt` starts at 1.
    Reconnecting { attempt: u32 },
}

impl From<&PushSignal> for SessionState {
    fn from(signal: &PushSignal) -> Self {
        match signal {
            PushSignal::Connecting { attempt: 0 } => Self::Connecting,
            PushSignal::Connecting { attempt } => Self::Reconnecting { attempt: *attempt },
            PushSignal::Connected { .. } => Self::Connected,
            PushSignal::Disconnected { .. } => Self::Disconnected,
        }
    }
}

/// A normalized inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Alert(CanonicalAlert),
    Occupancy(OccupancyEvent),
}

pub struct LiveFeedSession {
    config: DashboardConfig,
    state: Arc<dyn ClientState>,
    directory: Arc<ReferenceDirectory>,
    handle: Mutex<Option<PushHandle>>,
    frames: broadcast::Sender<Arc<PushFrame>>,
}

impl LiveFeedSession {
    pub fn new(
        config: DashboardConfig,
        state: Arc<dyn ClientState>,
        directory: Arc<ReferenceDirectory>,
    ) -> Self {
        Self {
            config,
            state,
            directory,
            handle: Mutex::new(None),
            frames: PushHandle::frame_channel(),
        }
    }

    /// Open the push channel. No-op while a connection is live or being
    /// established. Must be called inside a Tokio runtime.
    pub fn connect(&self) -> Result<(), CoreError> {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("live feed already active");
            return Ok(());
        }

        let Some(token) = self.state.auth_token() else {
            warn!("cannot open live feed without an auth token");
            return Err(CoreError::NotAuthenticated);
        };

        if let Some(stale) = slot.take() {
            stale.shutdown();
        }

        info!(url = %self.config.socket_url, "opening live feed");
        *slot = Some(PushHandle::spawn(
            self.push_config(token),
            self.frames.clone(),
            CancellationToken::new(),
        ));
        Ok(())
    }

    /// Close the push channel. Safe to call repeatedly.
    pub fn disconnect(&self) {
        if let Some(handle) = self.slot().take() {
            info!("closing live feed");
            handle.shutdown();
        }
    }

    pub fn state(&self) -> SessionState {
        self.slot()
            .as_ref()
            .map_or(SessionState::Disconnected, |h| SessionState::from(&h.signal()))
    }

    /// Transport in use, once connected.
    pub fn transport(&self) -> Option<TransportKind> {
        match self.slot().as_ref()?.signal() {
            PushSignal::Connected { transport } => Some(transport),
            _ => None,
        }
    }

    /// Lifecycle signals of the current connection, if any.
    pub fn signals(&self) -> Option<watch::Receiver<PushSignal>> {
        self.slot().as_ref().map(PushHandle::signals)
    }

    /// Normalized alerts only.
    pub fn on_alert(&self) -> AlertSubscription {
        AlertSubscription(self.subscribe())
    }

    /// Validated occupancy updates only.
    pub fn on_live_occupancy(&self) -> OccupancySubscription {
        OccupancySubscription(self.subscribe())
    }

    /// Alerts and occupancy updates interleaved in delivery order.
    pub fn on_events(&self) -> EventSubscription {
        self.subscribe()
    }

    fn subscribe(&self) -> EventSubscription {
        // Receiver first so nothing emitted by a fresh connection is missed.
        let frames = self.frames.subscribe();
        if let Err(e) = self.connect() {
            debug!(error = %e, "subscription created without a live connection");
        }
        EventSubscription {
            frames,
            directory: Arc::clone(&self.directory),
        }
    }

    fn push_config(&self, token: SecretString) -> PushConfig {
        PushConfig {
            socket_url: self.config.socket_url.clone(),
            token,
            reconnect: self.config.reconnect_config(),
            transport: self.config.transport(),
            websocket: self.config.websocket_enabled,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PushHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LiveFeedSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ── Subscriptions ────────────────────────────────────────────────────
//
// Each owns its own broadcast receiver. Dropping one detaches only that
// listener; the connection and other subscribers are unaffected.

pub struct EventSubscription {
    frames: broadcast::Receiver<Arc<PushFrame>>,
    directory: Arc<ReferenceDirectory>,
}

impl EventSubscription {
    /// Next event, or `None` once the session is gone.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        loop {
            let frame = match self.frames.recv().await {
                Ok(frame) => frame,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live feed subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            };

            match &frame.kind {
                PushKind::Alert => {
                    let directory = self.directory.snapshot();
                    return Some(LiveEvent::Alert(normalize(&frame.payload, &directory)));
                }
                PushKind::LiveOccupancy => {
                    if let Some(event) = parse_occupancy(&frame.payload) {
                        return Some(LiveEvent::Occupancy(event));
                    }
                }
                PushKind::Other(name) => debug!(event = %name, "ignoring push event"),
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = LiveEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        }
    }
}

pub struct AlertSubscription(EventSubscription);

impl AlertSubscription {
    pub async fn recv(&mut self) -> Option<CanonicalAlert> {
        loop {
            if let LiveEvent::Alert(alert) = self.0.recv().await? {
                return Some(alert);
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = CanonicalAlert> + Send {
        async_stream::stream! {
            while let Some(alert) = self.recv().await {
                yield alert;
            }
        }
    }
}

pub struct OccupancySubscription(EventSubscription);

impl OccupancySubscription {
    pub async fn recv(&mut self) -> Option<OccupancyEvent> {
        loop {
            if let LiveEvent::Occupancy(event) = self.0.recv().await? {
                return Some(event);
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = OccupancyEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ActionType, Site, Zone};
    use crate::state::MemoryClientState;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;

    fn session(state: MemoryClientState) -> LiveFeedSession {
        let state: Arc<dyn ClientState> = Arc::new(state);
        let directory = Arc::new(ReferenceDirectory::new(Arc::clone(&state)));
        directory.load(vec![Site::new("s1", "Mall", vec![Zone::new("z1", "Lobby")])]);
        // Nothing listens here; connection attempts fail fast.
        let mut config = DashboardConfig::new(Url::parse("http://127.0.0.1:9/api").unwrap());
        config.reconnect.attempts = Some(0);
        LiveFeedSession::new(config, state, directory)
    }

    fn emit(session: &LiveFeedSession, kind: PushKind, payload: serde_json::Value) {
        session.frames.send(Arc::new(PushFrame { kind, payload })).unwrap();
    }

    #[tokio::test]
    async fn connect_without_token_stays_disconnected() {
        let session = session(MemoryClientState::new());
        let err = session.connect().unwrap_err();
        assert!(matches!(err, CoreError::NotAuthenticated));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let session = session(MemoryClientState::with_token("t"));
        session.connect().unwrap();
        assert_ne!(session.state(), SessionState::Disconnected);
        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn alerts_are_normalized_for_every_subscriber() {
        let session = session(MemoryClientState::new());
        let mut first = session.on_alert();
        let mut second = session.on_alert();

        emit(&session, PushKind::Alert, json!({ "zone": "z1", "actionType": "entry" }));

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert_eq!(a.zone, "Lobby");
        assert_eq!(a.action_type, ActionType::Entry);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn dropping_one_subscription_keeps_the_others() {
        let session = session(MemoryClientState::new());
        let dropped = session.on_alert();
        let mut kept = session.on_alert();
        drop(dropped);

        emit(&session, PushKind::Alert, json!({ "eventId": "e1" }));
        assert_eq!(kept.recv().await.unwrap().id, "e1");
    }

    #[tokio::test]
    async fn occupancy_without_number_is_skipped() {
        let session = session(MemoryClientState::new());
        let mut occupancy = session.on_live_occupancy();

        emit(&session, PushKind::LiveOccupancy, json!({ "site": "s1" }));
        emit(&session, PushKind::Alert, json!({}));
        emit(&session, PushKind::LiveOccupancy, json!({ "site": "s1", "occupancy": 9 }));

        let event = occupancy.recv().await.unwrap();
        assert_eq!(event.occupancy, 9.0);
    }

    #[tokio::test]
    async fn event_subscription_preserves_delivery_order() {
        let session = session(MemoryClientState::new());
        let mut events = session.on_events();

        emit(&session, PushKind::Alert, json!({ "eventId": "first" }));
        emit(&session, PushKind::Other("ping".into()), json!(null));
        emit(&session, PushKind::LiveOccupancy, json!({ "site": "s1", "occupancy": 3 }));

        assert!(matches!(events.recv().await, Some(LiveEvent::Alert(a)) if a.id == "first"));
        assert!(matches!(events.recv().await, Some(LiveEvent::Occupancy(_))));
    }

    #[test]
    fn push_signals_map_to_session_states() {
        assert_eq!(
            SessionState::from(&PushSignal::Connecting { attempt: 0 }),
            SessionState::Connecting
        );
        assert_eq!(
            SessionState::from(&PushSignal::Connecting { attempt: 2 }),
            SessionState::Reconnecting { attempt: 2 }
        );
        assert_eq!(
            SessionState::from(&PushSignal::Connected { transport: TransportKind::Polling }),
            SessionState::Connected
        );
    }
}

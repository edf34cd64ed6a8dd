//! Socket.IO push channel with bounded auto-reconnect.
//!
//! Opens a Socket.IO v4 session against the analytics backend, authenticates
//! with the bearer token in the namespace CONNECT packet, and fans server
//! events out through a [`tokio::sync::broadcast`] channel. The WebSocket
//! transport is tried first; when the upgrade itself fails the same attempt
//! falls back to Engine.IO long-polling.
//!
//! Reconnection follows the usual Socket.IO client rules:
//!
//! - transport errors back off exponentially, up to a bounded number of
//!   attempts, after which the handle reports
//!   [`DisconnectReason::RetriesExhausted`];
//! - a server-initiated namespace disconnect is followed by an immediate
//!   fresh connect;
//! - a transport close reconnects after the initial delay;
//! - a session that ends before the namespace CONNECT is acknowledged is a
//!   failed attempt and backs off like a transport error.
//!
//! # Example
//!
//! ```rust,ignore
//! let frames = PushHandle::frame_channel();
//! let mut rx = frames.subscribe();
//! let handle = PushHandle::spawn(config, frames, CancellationToken::new());
//!
//! while let Ok(frame) = rx.recv().await {
//!     println!("{:?}: {}", frame.kind, frame.payload);
//! }
//! handle.shutdown();
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::socketio::{self, Handshake, Packet};
use crate::transport::TransportConfig;

// ── Channel sizing ───────────────────────────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// Silence tolerated before the Engine.IO handshake tells us the real limit.
const HANDSHAKE_SILENCE: Duration = Duration::from_secs(45);

// ── Public types ─────────────────────────────────────────────────────

/// Server event kinds the dashboard consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushKind {
    Alert,
    LiveOccupancy,
    Other(String),
}

impl PushKind {
    pub fn from_event(name: &str) -> Self {
        match name {
            "alert" => Self::Alert,
            "liveOccupancy" => Self::LiveOccupancy,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// One server-emitted event, payload untouched.
#[derive(Debug, Clone)]
pub struct PushFrame {
    pub kind: PushKind,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl TransportKind {
    fn query_name(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::Polling => "polling",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// [`PushHandle::shutdown`] was called or the handle dropped.
    ClientShutdown,
    /// The reconnection budget ran out.
    RetriesExhausted,
}

/// Connection lifecycle as observed by the background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushSignal {
    /// Attempt `0` is the first connect; higher values are reconnects.
    Connecting { attempt: u32 },
    Connected { transport: TransportKind },
    Disconnected { reason: DisconnectReason },
}

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s.
    pub max_delay: Duration,

    /// Reconnection attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_attempts: Some(5),
        }
    }
}

/// Everything needed to open a push session.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Origin of the Socket.IO server, e.g. `https://host`.
    pub socket_url: Url,
    pub token: SecretString,
    pub reconnect: ReconnectConfig,
    pub transport: TransportConfig,
    /// Try the WebSocket transport before long-polling.
    pub websocket: bool,
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push session.
///
/// Dropping the handle or calling [`shutdown`](Self::shutdown) tears down
/// the background task. Frames keep flowing to every receiver of the
/// broadcast sender passed to [`spawn`](Self::spawn), so subscribers
/// survive a handle being replaced.
pub struct PushHandle {
    signal_rx: watch::Receiver<PushSignal>,
    cancel: CancellationToken,
}

impl PushHandle {
    /// A broadcast sender sized for push traffic.
    pub fn frame_channel() -> broadcast::Sender<Arc<PushFrame>> {
        broadcast::channel(FRAME_CHANNEL_CAPACITY).0
    }

    /// Spawn the connect/reconnect loop. Must be called inside a Tokio runtime.
    ///
    /// Returns immediately; the first connection attempt runs in the background.
    pub fn spawn(
        config: PushConfig,
        frames: broadcast::Sender<Arc<PushFrame>>,
        cancel: CancellationToken,
    ) -> Self {
        let (signal_tx, signal_rx) = watch::channel(PushSignal::Connecting { attempt: 0 });

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            push_loop(config, frames, signal_tx, task_cancel).await;
        });

        Self { signal_rx, cancel }
    }

    /// Latest lifecycle signal.
    pub fn signal(&self) -> PushSignal {
        self.signal_rx.borrow().clone()
    }

    /// Watch receiver for lifecycle changes.
    pub fn signals(&self) -> watch::Receiver<PushSignal> {
        self.signal_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.signal(), PushSignal::Connected { .. })
    }

    /// `true` once the loop has stopped for good.
    pub fn is_finished(&self) -> bool {
        matches!(self.signal(), PushSignal::Disconnected { .. })
    }

    /// Signal the background task to shut down gracefully.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// How a single session ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    ServerDisconnect,
    TransportClosed,
    Cancelled,
}

/// Main loop: connect → read → on error, backoff → reconnect.
async fn push_loop(
    config: PushConfig,
    frames: broadcast::Sender<Arc<PushFrame>>,
    signals: watch::Sender<PushSignal>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    let reason = loop {
        signals.send_replace(PushSignal::Connecting { attempt });

        let mut convo = Conversation::new(&config.token, &frames, &signals);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break DisconnectReason::ClientShutdown,
            result = run_session(&config, &mut convo, &cancel) => result,
        };

        let connected = convo.connected;
        if connected {
            attempt = 0;
        }

        // A session that never got its namespace CONNECT counts as a failed
        // attempt, however it ended.
        let outcome = match result {
            Ok(SessionEnd::Cancelled) => break DisconnectReason::ClientShutdown,
            Ok(SessionEnd::ServerDisconnect) if connected => {
                info!("server closed the namespace, reconnecting");
                Ok(None)
            }
            Ok(SessionEnd::TransportClosed) if connected => {
                info!("push transport closed, reconnecting");
                Ok(Some(config.reconnect.initial_delay))
            }
            Ok(end) => Err(Error::PushConnect(format!(
                "session ended ({end:?}) before the namespace connected"
            ))),
            Err(e) => Err(e),
        };

        let delay = match outcome {
            Ok(delay) => delay,
            Err(e) => {
                warn!(error = %e, attempt, "push session failed");

                if config.reconnect.max_attempts.is_some_and(|max| attempt >= max) {
                    error!(attempts = attempt, "push reconnection limit reached, giving up");
                    break DisconnectReason::RetriesExhausted;
                }

                let delay = calculate_backoff(attempt, &config.reconnect);
                attempt += 1;
                Some(delay)
            }
        };

        if let Some(delay) = delay {
            debug!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break DisconnectReason::ClientShutdown,
                () = tokio::time::sleep(delay) => {}
            }
        }
    };

    signals.send_replace(PushSignal::Disconnected { reason });
    debug!(?reason, "push loop exiting");
}

/// One attempt: WebSocket first, long-polling if the upgrade is refused.
async fn run_session(
    config: &PushConfig,
    convo: &mut Conversation<'_>,
    cancel: &CancellationToken,
) -> Result<SessionEnd, Error> {
    if config.websocket {
        match run_websocket(config, convo, cancel).await {
            Err(Error::PushUnavailable(reason)) => {
                debug!(%reason, "websocket unavailable, falling back to long-polling");
            }
            other => return other,
        }
    }
    run_polling(config, convo, cancel).await
}

// ── Protocol state shared by both transports ─────────────────────────

enum Reply {
    Nothing,
    Send(String),
    End(SessionEnd),
}

struct Conversation<'a> {
    token: &'a SecretString,
    frames: &'a broadcast::Sender<Arc<PushFrame>>,
    signals: &'a watch::Sender<PushSignal>,
    transport: TransportKind,
    handshake: Option<Handshake>,
    connected: bool,
}

impl<'a> Conversation<'a> {
    fn new(
        token: &'a SecretString,
        frames: &'a broadcast::Sender<Arc<PushFrame>>,
        signals: &'a watch::Sender<PushSignal>,
    ) -> Self {
        Self {
            token,
            frames,
            signals,
            transport: TransportKind::WebSocket,
            handshake: None,
            connected: false,
        }
    }

    fn silence_limit(&self) -> Duration {
        self.handshake
            .as_ref()
            .map_or(HANDSHAKE_SILENCE, Handshake::silence_limit)
    }

    fn handle(&mut self, text: &str) -> Result<Reply, Error> {
        let packet = match socketio::decode(text) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, "ignoring undecodable push frame");
                return Ok(Reply::Nothing);
            }
        };

        match packet {
            Packet::Open(handshake) => {
                debug!(sid = %handshake.sid, transport = %self.transport, "engine handshake");
                self.handshake = Some(handshake);
                Ok(Reply::Send(socketio::connect_packet(
                    self.token.expose_secret(),
                )))
            }
            Packet::Connect => {
                self.connected = true;
                info!(transport = %self.transport, "push channel connected");
                self.signals.send_replace(PushSignal::Connected {
                    transport: self.transport,
                });
                Ok(Reply::Nothing)
            }
            Packet::ConnectError(message) => Err(Error::PushRejected(message)),
            Packet::Ping => Ok(Reply::Send(socketio::PONG.to_owned())),
            Packet::Event { name, payload } => {
                trace!(event = %name, "push event");
                let frame = PushFrame {
                    kind: PushKind::from_event(&name),
                    payload,
                };
                // No receivers is fine; nothing is listening right now.
                let _ = self.frames.send(Arc::new(frame));
                Ok(Reply::Nothing)
            }
            Packet::Disconnect => Ok(Reply::End(SessionEnd::ServerDisconnect)),
            Packet::Close => Ok(Reply::End(SessionEnd::TransportClosed)),
            Packet::Pong | Packet::Noop | Packet::Upgrade | Packet::Ignored => Ok(Reply::Nothing),
        }
    }
}

// ── WebSocket transport ──────────────────────────────────────────────

async fn run_websocket(
    config: &PushConfig,
    convo: &mut Conversation<'_>,
    cancel: &CancellationToken,
) -> Result<SessionEnd, Error> {
    let url = endpoint_url(&config.socket_url, TransportKind::WebSocket)?;
    info!(url = %url, "connecting push websocket");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::PushConnect(e.to_string()))?;

    let connector = config.transport.websocket_connector()?;
    let (ws_stream, _response) = tokio_tungstenite::connect_async_tls_with_config(
        ClientRequestBuilder::new(uri),
        None,
        false,
        connector,
    )
    .await
    .map_err(|e| Error::PushUnavailable(e.to_string()))?;

    convo.transport = TransportKind::WebSocket;
    let (mut write, mut read) = ws_stream.split();

    loop {
        let silence = convo.silence_limit();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = write.send(Message::Text(socketio::DISCONNECT.into())).await;
                let _ = write.close().await;
                return Ok(SessionEnd::Cancelled);
            }
            () = tokio::time::sleep(silence) => {
                return Err(Error::PushConnect(format!(
                    "no traffic for {}s", silence.as_secs()
                )));
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match convo.handle(&text)? {
                    Reply::Nothing => {}
                    Reply::Send(out) => write
                        .send(Message::Text(out.into()))
                        .await
                        .map_err(|e| Error::PushConnect(e.to_string()))?,
                    Reply::End(end) => return Ok(end),
                },
                Some(Ok(Message::Close(frame))) => {
                    if let Some(ref cf) = frame {
                        info!(code = %cf.code, reason = %cf.reason, "push websocket closed");
                    } else {
                        info!("push websocket closed (no payload)");
                    }
                    return Ok(SessionEnd::TransportClosed);
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong, Frame: tungstenite answers pings itself.
                }
                Some(Err(e)) => return Err(Error::PushConnect(e.to_string())),
                None => return Ok(SessionEnd::TransportClosed),
            }
        }
    }
}

// ── Long-polling transport ───────────────────────────────────────────

async fn run_polling(
    config: &PushConfig,
    convo: &mut Conversation<'_>,
    cancel: &CancellationToken,
) -> Result<SessionEnd, Error> {
    let base = endpoint_url(&config.socket_url, TransportKind::Polling)?;
    let http = config.transport.build_polling_client(HANDSHAKE_SILENCE)?;
    convo.transport = TransportKind::Polling;
    info!(url = %base, "connecting push long-poll");

    let mut session_url: Option<Url> = None;

    loop {
        let url = session_url.clone().unwrap_or_else(|| base.clone());
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Some(url) = &session_url {
                    let _ = poll_send(&http, url, socketio::DISCONNECT).await;
                }
                return Ok(SessionEnd::Cancelled);
            }
            body = poll_fetch(&http, url) => body?,
        };

        for packet in socketio::split_payload(&body) {
            let reply = convo.handle(packet)?;

            if session_url.is_none() {
                session_url = convo
                    .handshake
                    .as_ref()
                    .map(|hs| with_sid(&base, &hs.sid));
            }

            match reply {
                Reply::Nothing => {}
                Reply::Send(out) => {
                    let Some(url) = &session_url else {
                        return Err(Error::Protocol("packet sent before handshake".into()));
                    };
                    poll_send(&http, url, &out).await?;
                }
                Reply::End(end) => return Ok(end),
            }
        }

        if session_url.is_none() {
            return Err(Error::Protocol("long-poll handshake missing".into()));
        }
    }
}

async fn poll_fetch(http: &reqwest::Client, url: Url) -> Result<String, Error> {
    trace!(url = %url, "long-poll GET");
    http.get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::PushConnect(e.to_string()))?
        .text()
        .await
        .map_err(|e| Error::PushConnect(e.to_string()))
}

async fn poll_send(http: &reqwest::Client, url: &Url, packet: &str) -> Result<(), Error> {
    trace!(url = %url, "long-poll POST");
    http.post(url.clone())
        .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
        .body(packet.to_owned())
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| Error::PushConnect(e.to_string()))?;
    Ok(())
}

// ── URL construction ─────────────────────────────────────────────────

/// `<origin>/socket.io/?EIO=4&transport=<kind>`, with the scheme adjusted to
/// the transport.
fn endpoint_url(origin: &Url, kind: TransportKind) -> Result<Url, Error> {
    let mut url = origin.clone();

    let scheme = match (kind, url.scheme()) {
        (TransportKind::WebSocket, "https" | "wss") => "wss",
        (TransportKind::WebSocket, _) => "ws",
        (TransportKind::Polling, "https" | "wss") => "https",
        (TransportKind::Polling, _) => "http",
    };
    url.set_scheme(scheme)
        .map_err(|()| Error::PushConnect(format!("cannot derive {kind} url from {origin}")))?;

    let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some(&format!(
        "EIO={}&transport={}",
        socketio::ENGINE_IO_VERSION,
        kind.query_name()
    )));
    Ok(url)
}

fn with_sid(base: &Url, sid: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair("sid", sid);
    url
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`, jitter within +-25%.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(5));
        assert_eq!(config.max_attempts, Some(5));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert_eq!(d0, Duration::from_secs(1));
        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig::default();
        let d10 = calculate_backoff(10, &config);
        assert!(
            d10 <= Duration::from_millis(6_250),
            "delay at attempt 10 ({d10:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn websocket_url_from_https_origin() {
        let origin = Url::parse("https://counts.example.com").unwrap();
        let url = endpoint_url(&origin, TransportKind::WebSocket).unwrap();
        assert_eq!(
            url.as_str(),
            "wss://counts.example.com/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn polling_url_keeps_path_prefix() {
        let origin = Url::parse("http://localhost:3000/realtime/").unwrap();
        let url = endpoint_url(&origin, TransportKind::Polling).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/realtime/socket.io/?EIO=4&transport=polling"
        );
        assert_eq!(
            with_sid(&url, "abc").as_str(),
            "http://localhost:3000/realtime/socket.io/?EIO=4&transport=polling&sid=abc"
        );
    }

    #[test]
    fn push_kind_from_event_name() {
        assert_eq!(PushKind::from_event("alert"), PushKind::Alert);
        assert_eq!(PushKind::from_event("liveOccupancy"), PushKind::LiveOccupancy);
        assert_eq!(
            PushKind::from_event("other"),
            PushKind::Other("other".into())
        );
    }

    #[tokio::test]
    async fn conversation_drives_handshake_and_events() {
        let token = SecretString::from("tok");
        let frames = PushHandle::frame_channel();
        let mut rx = frames.subscribe();
        let (signals, signal_rx) = watch::channel(PushSignal::Connecting { attempt: 0 });
        let mut convo = Conversation::new(&token, &frames, &signals);

        let reply = convo
            .handle(r#"0{"sid":"s1","upgrades":[],"pingInterval":1000,"pingTimeout":500}"#)
            .unwrap();
        assert!(matches!(reply, Reply::Send(ref p) if p == r#"40{"token":"tok"}"#));
        assert_eq!(convo.silence_limit(), Duration::from_millis(1500));

        assert!(matches!(convo.handle("40").unwrap(), Reply::Nothing));
        assert!(convo.connected);
        assert_eq!(
            *signal_rx.borrow(),
            PushSignal::Connected {
                transport: TransportKind::WebSocket
            }
        );

        assert!(matches!(convo.handle("2").unwrap(), Reply::Send(ref p) if p == "3"));

        convo.handle(r#"42["alert",{"zone":"z1"}]"#).unwrap();
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.kind, PushKind::Alert);
        assert_eq!(frame.payload["zone"], "z1");

        assert!(matches!(
            convo.handle("garbage").unwrap(),
            Reply::Nothing
        ));
        assert!(matches!(
            convo.handle("41").unwrap(),
            Reply::End(SessionEnd::ServerDisconnect)
        ));
        assert!(matches!(
            convo.handle("1").unwrap(),
            Reply::End(SessionEnd::TransportClosed)
        ));
    }

    #[test]
    fn connect_error_fails_the_attempt() {
        let token = SecretString::from("tok");
        let frames = PushHandle::frame_channel();
        let (signals, _rx) = watch::channel(PushSignal::Connecting { attempt: 0 });
        let mut convo = Conversation::new(&token, &frames, &signals);

        let err = convo
            .handle(r#"44{"message":"unauthorized"}"#)
            .err()
            .unwrap();
        assert!(matches!(err, Error::PushRejected(ref m) if m == "unauthorized"));
    }
}

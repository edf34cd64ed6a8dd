//! Async client for the crowdlens people-counting analytics backend.
//!
//! Two surfaces live here:
//!
//! - **REST** ([`ApiClient`]): bearer-token authenticated JSON endpoints for
//!   login, the site catalogue, analytics aggregates, and the paginated
//!   entry/exit log.
//! - **Push** ([`PushHandle`]): a Socket.IO v4 session that streams `alert`
//!   and `liveOccupancy` events, with bounded reconnection and an HTTP
//!   long-polling fallback when the WebSocket upgrade is unavailable.
//!
//! Everything above the wire (zone resolution, normalization, state) lives
//! in `crowdlens-core`.

pub mod analytics;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod push;
pub mod sites;
pub mod socketio;
pub mod transport;

pub use client::ApiClient;
pub use error::Error;
pub use models::TimeRange;
pub use push::{
    DisconnectReason, PushConfig, PushFrame, PushHandle, PushKind, PushSignal, ReconnectConfig,
    TransportKind,
};
pub use transport::{TlsMode, TransportConfig};

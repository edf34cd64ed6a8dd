//! Minimal Socket.IO v4 / Engine.IO v4 text codec.
//!
//! Only the subset a receive-mostly client needs: the Engine.IO open
//! handshake, ping/pong, close, and the Socket.IO connect, disconnect,
//! connect-error, and event packets on any namespace. Binary attachments
//! are not supported.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Engine.IO protocol revision sent in the `EIO` query parameter.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Engine.IO pong, sent in answer to a server ping.
pub const PONG: &str = "3";

/// Socket.IO disconnect for the default namespace.
pub const DISCONNECT: &str = "41";

/// Separator between packets in a long-polling payload.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Engine.IO `open` packet body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl Handshake {
    /// How long the link may stay silent before it is considered dead.
    pub fn silence_limit(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// A decoded text packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Upgrade,
    /// Namespace connection acknowledged.
    Connect,
    /// Server-side disconnect of the namespace.
    Disconnect,
    /// Namespace connection refused, with the server's message.
    ConnectError(String),
    Event { name: String, payload: Value },
    /// Well-formed packet the client has no use for (acks, binary).
    Ignored,
}

/// Build the namespace CONNECT packet carrying the auth token.
pub fn connect_packet(token: &str) -> String {
    format!("40{}", serde_json::json!({ "token": token }))
}

/// Split a long-polling payload into its packets.
pub fn split_payload(body: &str) -> impl Iterator<Item = &str> {
    body.split(RECORD_SEPARATOR).filter(|p| !p.is_empty())
}

/// Decode one Engine.IO text packet.
pub fn decode(text: &str) -> Result<Packet, Error> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty packet".into()))?;
    let rest = chars.as_str();

    match kind {
        '0' => serde_json::from_str(rest)
            .map(Packet::Open)
            .map_err(|e| Error::Protocol(format!("bad open packet: {e}"))),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_socket(rest),
        '5' => Ok(Packet::Upgrade),
        '6' => Ok(Packet::Noop),
        other => Err(Error::Protocol(format!("unknown engine packet type {other:?}"))),
    }
}

fn decode_socket(text: &str) -> Result<Packet, Error> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| Error::Protocol("empty socket packet".into()))?;
    let body = strip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(body),
        '4' => Ok(Packet::ConnectError(connect_error_message(body))),
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(Error::Protocol(format!("unknown socket packet type {other:?}"))),
    }
}

/// Drop a leading `/nsp,` so all namespaces decode alike.
fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn decode_event(body: &str) -> Result<Packet, Error> {
    // Optional ack id precedes the JSON array.
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let args: Vec<Value> =
        serde_json::from_str(body).map_err(|e| Error::Protocol(format!("bad event body: {e}")))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(Error::Protocol("event without a name".into())),
    };
    Ok(Packet::Event {
        name,
        payload: args.next().unwrap_or(Value::Null),
    })
}

fn connect_error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| body.to_owned(), str::to_owned),
        Ok(Value::String(msg)) => msg,
        _ => body.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn open_handshake() {
        let pkt = decode(r#"0{"sid":"abc","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":5000,"maxPayload":1000000}"#).unwrap();
        let Packet::Open(hs) = pkt else {
            panic!("expected open, got {pkt:?}");
        };
        assert_eq!(hs.sid, "abc");
        assert_eq!(hs.silence_limit(), Duration::from_millis(30_000));
    }

    #[test]
    fn engine_control_packets() {
        assert_eq!(decode("1").unwrap(), Packet::Close);
        assert_eq!(decode("2").unwrap(), Packet::Ping);
        assert_eq!(decode("3").unwrap(), Packet::Pong);
        assert_eq!(decode("6").unwrap(), Packet::Noop);
    }

    #[test]
    fn socket_connect_and_disconnect() {
        assert_eq!(decode(r#"40{"sid":"xyz"}"#).unwrap(), Packet::Connect);
        assert_eq!(decode("41").unwrap(), Packet::Disconnect);
        assert_eq!(decode("41/admin,").unwrap(), Packet::Disconnect);
    }

    #[test]
    fn event_with_payload() {
        let pkt = decode(r#"42["alert",{"zone":"z1","direction":"zone-exit"}]"#).unwrap();
        assert_eq!(
            pkt,
            Packet::Event {
                name: "alert".into(),
                payload: json!({"zone": "z1", "direction": "zone-exit"}),
            }
        );
    }

    #[test]
    fn event_with_namespace_and_ack_id() {
        let pkt = decode(r#"42/feed,17["liveOccupancy",{"occupancy":4}]"#).unwrap();
        assert_eq!(
            pkt,
            Packet::Event {
                name: "liveOccupancy".into(),
                payload: json!({"occupancy": 4}),
            }
        );
    }

    #[test]
    fn event_without_payload_is_null() {
        let pkt = decode(r#"42["ping-me"]"#).unwrap();
        assert_eq!(
            pkt,
            Packet::Event {
                name: "ping-me".into(),
                payload: Value::Null,
            }
        );
    }

    #[test]
    fn connect_error_message_extracted() {
        assert_eq!(
            decode(r#"44{"message":"invalid token"}"#).unwrap(),
            Packet::ConnectError("invalid token".into())
        );
    }

    #[test]
    fn malformed_packets_are_errors() {
        assert!(decode("").is_err());
        assert!(decode("9").is_err());
        assert!(decode("42not-json").is_err());
        assert!(decode("42[5]").is_err());
    }

    #[test]
    fn connect_packet_carries_token() {
        assert_eq!(connect_packet("t0k"), r#"40{"token":"t0k"}"#);
    }

    #[test]
    fn polling_payload_split() {
        let body = "2\u{1e}42[\"alert\",{}]\u{1e}";
        let parts: Vec<&str> = split_payload(body).collect();
        assert_eq!(parts, vec!["2", "42[\"alert\",{}]"]);
    }
}

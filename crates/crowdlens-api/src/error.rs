use thiserror::Error;

/// Top-level error type for the `crowdlens-api` crate.
///
/// Covers authentication, transport, REST responses, and the push channel.
/// `crowdlens-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or the bearer token was refused (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated call was attempted without a stored token.
    #[error("No authentication token available -- log in first")]
    MissingToken,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── REST ────────────────────────────────────────────────────────
    /// Non-success HTTP status from a REST endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Push channel ────────────────────────────────────────────────
    /// The push transport could not be established or broke mid-session.
    #[error("Push connection failed: {0}")]
    PushConnect(String),

    /// The WebSocket upgrade itself failed; polling may still work.
    #[error("WebSocket transport unavailable: {0}")]
    PushUnavailable(String),

    /// The server refused the Socket.IO namespace connection.
    #[error("Push connection rejected: {0}")]
    PushRejected(String),

    /// A frame on the push channel could not be decoded.
    #[error("Malformed push frame: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if this error indicates the token is missing or refused
    /// and logging in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::MissingToken)
            || matches!(self, Self::Api { status: 401, .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::PushConnect(_) | Self::PushUnavailable(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_classification() {
        assert!(Error::MissingToken.is_auth_expired());
        assert!(
            Error::Api {
                status: 401,
                message: String::new()
            }
            .is_auth_expired()
        );
        assert!(!Error::PushRejected("nope".into()).is_auth_expired());
    }

    #[test]
    fn transient_classification() {
        assert!(Error::PushUnavailable("refused".into()).is_transient());
        assert!(
            Error::Api {
                status: 503,
                message: "busy".into()
            }
            .is_transient()
        );
        assert!(
            !Error::Api {
                status: 400,
                message: "bad".into()
            }
            .is_transient()
        );
        assert!(!Error::Protocol("x".into()).is_transient());
    }
}

// ── Core error types ──
//
// User-facing errors from crowdlens-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<crowdlens_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Request timed out")]
    Timeout,

    // ── Site errors ──────────────────────────────────────────────────
    #[error("No sites are available for this account")]
    NoSites,

    #[error("Site not found: {identifier}")]
    SiteNotFound { identifier: String },

    #[error("Failed to load site information: {reason}")]
    SiteLoadFailed { reason: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The message a dashboard user should see.
    ///
    /// Only login and site loading surface to users; every other failure is
    /// reported generically and logged in detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed { .. } | Self::NotAuthenticated => {
                "Login failed. Please check your credentials."
            }
            Self::NoSites | Self::SiteNotFound { .. } | Self::SiteLoadFailed { .. } => {
                "Failed to load site information"
            }
            _ => "Something went wrong. Please try again.",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::NotAuthenticated
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<crowdlens_api::Error> for CoreError {
    fn from(err: crowdlens_api::Error) -> Self {
        use crowdlens_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::MissingToken => CoreError::NotAuthenticated,
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Api { status: 401, message } => CoreError::AuthenticationFailed { message },
            ApiError::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::PushConnect(reason) | ApiError::PushUnavailable(reason) => {
                CoreError::ConnectionFailed {
                    url: String::new(),
                    reason: format!("Live feed connection failed: {reason}"),
                }
            }
            ApiError::PushRejected(message) => CoreError::AuthenticationFailed { message },
            ApiError::Protocol(message) => CoreError::Internal(message),
        }
    }
}

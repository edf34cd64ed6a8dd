// ── Runtime dashboard configuration ──
//
// Describes where the backend lives and how to talk to it. Never touches
// disk; the CLI builds a `DashboardConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use crowdlens_api::{ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed development backends).
    DangerAcceptInvalid,
}

/// Live-feed reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts after the first failure. `None` retries forever.
    pub attempts: Option<u32>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: Some(5),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Configuration for one dashboard session.
///
/// Built by the CLI, passed to [`Dashboard`](crate::Dashboard).
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// REST base URL (e.g., `https://host/api`).
    pub api_url: Url,
    /// Socket.IO origin (e.g., `https://host`).
    pub socket_url: Url,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    /// Background analytics refresh period. Zero disables it.
    pub refresh_interval: Duration,
    /// Rows per page in the entry/exit log.
    pub page_size: u32,
    pub reconnect: ReconnectPolicy,
    /// Try the WebSocket transport before long-polling.
    pub websocket_enabled: bool,
}

impl DashboardConfig {
    /// Defaults for `api_url`, with the push origin derived from it.
    pub fn new(api_url: Url) -> Self {
        let socket_url = origin_of(&api_url);
        Self {
            api_url,
            socket_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(30),
            page_size: 10,
            reconnect: ReconnectPolicy::default(),
            websocket_enabled: true,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    pub(crate) fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: self.reconnect.initial_delay,
            max_delay: self.reconnect.max_delay,
            max_attempts: self.reconnect.attempts,
        }
    }
}

/// Scheme, host, and port of `url` with the path stripped.
pub fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_defaults_to_api_origin() {
        let config = DashboardConfig::new(Url::parse("https://counts.example.com/api").unwrap());
        assert_eq!(config.socket_url.as_str(), "https://counts.example.com/");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn reconnect_policy_maps_to_transport() {
        let mut config = DashboardConfig::new(Url::parse("http://localhost:8080/api").unwrap());
        config.reconnect.attempts = None;
        let rc = config.reconnect_config();
        assert_eq!(rc.max_attempts, None);
        assert_eq!(rc.initial_delay, Duration::from_secs(1));
    }
}

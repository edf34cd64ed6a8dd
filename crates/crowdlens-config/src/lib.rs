//! Configuration for the crowdlens CLI.
//!
//! TOML config merged with `CROWDLENS_*` environment variables, the on-disk
//! client state (token, selected site, email), password lookup through the
//! environment and system keyring, and translation to
//! `crowdlens_core::DashboardConfig`.

mod state;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crowdlens_core::{DashboardConfig, ReconnectPolicy, TlsVerification};

pub use state::FileClientState;

/// Keyring service name; the account is the user's email.
const KEYRING_SERVICE: &str = "crowdlens";

/// Environment variable checked before the keyring.
pub const PASSWORD_ENV: &str = "CROWDLENS_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API URL configured (set api_url in {path} or CROWDLENS_API_URL)")]
    MissingApiUrl { path: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// REST base URL, e.g. `https://counts.example.com/api`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Push origin. Defaults to the origin of `api_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_url: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Custom CA certificate for self-hosted backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Background analytics refresh, humantime (`"30s"`, `"2m"`). `"0s"` disables it.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: String,

    /// Try WebSocket before long-polling.
    #[serde(default = "default_true")]
    pub websocket: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
            refresh_interval: default_refresh_interval(),
            page_size: default_page_size(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay: default_reconnect_delay(),
            websocket: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_interval() -> String {
    "30s".into()
}
fn default_page_size() -> u32 {
    10
}
fn default_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_delay() -> String {
    "1s".into()
}
fn default_true() -> bool {
    true
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "crowdlens", "crowdlens")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("crowdlens");
    p
}

/// `config.toml` under the platform config directory.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// `state.toml` under the platform data directory.
pub fn state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state.toml"),
        |dirs| dirs.data_dir().join("state.toml"),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` plus environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CROWDLENS_").split("__"));

    Ok(figment.extract()?)
}

pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}': {e}"),
    })
}

/// Build a `DashboardConfig` from file values alone.
pub fn to_dashboard_config(cfg: &Config) -> Result<DashboardConfig, ConfigError> {
    let raw = cfg.api_url.as_deref().ok_or_else(|| ConfigError::MissingApiUrl {
        path: config_path().display().to_string(),
    })?;
    let mut dashboard = DashboardConfig::new(parse_url("api_url", raw)?);

    if let Some(ref socket) = cfg.socket_url {
        dashboard.socket_url = parse_url("socket_url", socket)?;
    }

    let d = &cfg.defaults;
    dashboard.tls = if d.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca) = d.ca_cert {
        TlsVerification::CustomCa(ca.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    dashboard.timeout = Duration::from_secs(d.timeout);
    dashboard.refresh_interval = parse_duration("defaults.refresh_interval", &d.refresh_interval)?;
    if d.page_size == 0 {
        return Err(ConfigError::Validation {
            field: "defaults.page_size".into(),
            reason: "must be at least 1".into(),
        });
    }
    dashboard.page_size = d.page_size;
    dashboard.reconnect = ReconnectPolicy {
        attempts: Some(d.reconnect_attempts),
        initial_delay: parse_duration("defaults.reconnect_delay", &d.reconnect_delay)?,
        ..ReconnectPolicy::default()
    };
    dashboard.websocket_enabled = d.websocket;

    Ok(dashboard)
}

// ── Password lookup ─────────────────────────────────────────────────

/// Password for `email` from `CROWDLENS_PASSWORD`, then the keyring.
pub fn resolve_password(email: &str) -> Option<SecretString> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Some(SecretString::from(pw));
    }

    keyring::Entry::new(KEYRING_SERVICE, email)
        .and_then(|entry| entry.get_password())
        .map(SecretString::from)
        .ok()
}

/// Remember `password` for `email` in the system keyring.
pub fn store_password(email: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, email)?.set_password(password.expose_secret())?;
    Ok(())
}

/// Forget the keyring entry for `email`. A missing entry is fine.
pub fn delete_password(email: &str) -> Result<(), ConfigError> {
    match keyring::Entry::new(KEYRING_SERVICE, email)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

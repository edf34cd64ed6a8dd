//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use crowdlens_config::ConfigError;
use crowdlens_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(crowdlens::connection_failed),
        help(
            "{reason}\n\
             Check api_url with: crowdlens config show\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(crowdlens::timeout),
        help("Increase the timeout with --timeout or check the backend.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login failed. Please check your credentials.")]
    #[diagnostic(code(crowdlens::auth_failed), help("{message}\nRun: crowdlens login"))]
    AuthFailed { message: String },

    #[error("Not logged in")]
    #[diagnostic(code(crowdlens::not_logged_in), help("Run: crowdlens login <email>"))]
    NotLoggedIn,

    // ── Sites ────────────────────────────────────────────────────────
    #[error("Failed to load site information")]
    #[diagnostic(
        code(crowdlens::no_sites),
        help("The account has no sites. Ask an administrator to grant access.")
    )]
    NoSites,

    #[error("Failed to load site information")]
    #[diagnostic(code(crowdlens::site_load_failed), help("{reason}"))]
    SiteLoadFailed { reason: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(crowdlens::not_found),
        help("Run: crowdlens {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(crowdlens::api_error))]
    Api { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(crowdlens::validation))]
    Validation { field: String, reason: String },

    #[error("'{what}' needs an interactive terminal")]
    #[diagnostic(code(crowdlens::non_interactive), help("{hint}"))]
    NonInteractive { what: String, hint: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No API URL configured")]
    #[diagnostic(
        code(crowdlens::no_config),
        help(
            "Create a config with: crowdlens config init\n\
             Expected at: {path}\n\
             Or pass --api-url / set CROWDLENS_API_URL."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(crowdlens::config))]
    Config(ConfigError),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(crowdlens::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotLoggedIn => exit_code::AUTH,
            Self::NoSites | Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractive { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::NotAuthenticated => CliError::NotLoggedIn,
            CoreError::Timeout => CliError::Timeout,
            CoreError::NoSites => CliError::NoSites,
            CoreError::SiteNotFound { identifier } => CliError::NotFound {
                resource_type: "site".into(),
                identifier,
                list_command: "sites list".into(),
            },
            CoreError::SiteLoadFailed { reason } => CliError::SiteLoadFailed { reason },
            CoreError::Api { message, status } => CliError::Api { status, message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingApiUrl { path } => CliError::NoConfig { path },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

//! Resolves the runtime configuration: config file, environment, then
//! command-line overrides.

use std::sync::Arc;

use crowdlens_config::{Config, FileClientState};
use crowdlens_core::{ClientState, Dashboard, DashboardConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// File + env config with the global flags applied on top.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = crowdlens_config::load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        cfg.api_url = Some(url.clone());
    }
    if let Some(ref url) = global.socket_url {
        cfg.socket_url = Some(url.clone());
    }
    if global.insecure {
        cfg.defaults.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
}

pub fn dashboard_config(global: &GlobalOpts) -> Result<DashboardConfig, CliError> {
    let cfg = effective_config(global)?;
    Ok(crowdlens_config::to_dashboard_config(&cfg)?)
}

/// Persisted client state from the platform data directory.
pub fn client_state() -> Result<Arc<dyn ClientState>, CliError> {
    Ok(Arc::new(FileClientState::open_default()?))
}

/// A dashboard over the persisted client state.
pub fn open_dashboard(global: &GlobalOpts) -> Result<Dashboard, CliError> {
    let config = dashboard_config(global)?;
    tracing::debug!(api_url = %config.api_url, socket_url = %config.socket_url, "dashboard config");
    Ok(Dashboard::new(config, client_state()?)?)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["crowdlens"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["sites", "list"]);
        Cli::try_parse_from(argv).map(|cli| cli.global).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn flags_override_file_values() {
        let mut cfg = Config {
            api_url: Some("https://file.example.com/api".into()),
            ..Config::default()
        };
        apply_overrides(
            &mut cfg,
            &global(&["--api-url", "http://localhost:9000/api", "-k", "--timeout", "5"]),
        );
        assert_eq!(cfg.api_url.as_deref(), Some("http://localhost:9000/api"));
        assert!(cfg.defaults.insecure);
        assert_eq!(cfg.defaults.timeout, 5);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let mut cfg = Config {
            api_url: Some("https://file.example.com/api".into()),
            ..Config::default()
        };
        let before = cfg.clone();
        apply_overrides(&mut cfg, &global(&[]));
        assert_eq!(cfg, before);
    }
}

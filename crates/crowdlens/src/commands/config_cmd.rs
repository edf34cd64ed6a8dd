//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::Input;
use secrecy::SecretString;

use crowdlens_config::{Config, Defaults};
use crowdlens_core::ClientState;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::{CliError, prompt_err};
use crate::output;

use super::util;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::effective_config(global)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml_text(c).unwrap_or_else(|e| e.to_string()),
                |c| c.api_url.clone().unwrap_or_default(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("config: {}", crowdlens_config::config_path().display());
            println!("state:  {}", crowdlens_config::state_path().display());
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = crowdlens_config::load_config()?;
            set_key(&mut cfg, &key, value)?;
            if cfg.api_url.is_some() {
                crowdlens_config::to_dashboard_config(&cfg)?;
            }
            crowdlens_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key}");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { email } => {
            let email = match email {
                Some(email) => email,
                None => config::client_state()?
                    .user_email()
                    .ok_or_else(|| CliError::Validation {
                        field: "email".into(),
                        reason: "not logged in; pass the email explicitly".into(),
                    })?,
            };
            let password = rpassword::prompt_password(format!("Password for {email}: "))?;
            crowdlens_config::store_password(&email, &SecretString::from(password))?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for {email}");
            }
            Ok(())
        }
    }
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = crowdlens_config::config_path();
    eprintln!("crowdlens configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    if path.exists() && !util::confirm("Overwrite the existing config?", global.yes)? {
        return Ok(());
    }

    let api_url: String = Input::new()
        .with_prompt("API URL")
        .default("https://localhost:8080/api".into())
        .interact_text()
        .map_err(prompt_err)?;

    let socket_url: String = Input::new()
        .with_prompt("Live feed URL (empty = same origin as the API)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let page_size: u32 = Input::new()
        .with_prompt("Entries per page")
        .default(Defaults::default().page_size)
        .interact_text()
        .map_err(prompt_err)?;

    let refresh_interval: String = Input::new()
        .with_prompt("Analytics refresh interval (0s disables)")
        .default(Defaults::default().refresh_interval)
        .interact_text()
        .map_err(prompt_err)?;

    let cfg = Config {
        api_url: Some(api_url),
        socket_url: Some(socket_url).filter(|s| !s.trim().is_empty()),
        defaults: Defaults {
            page_size,
            refresh_interval,
            insecure: global.insecure,
            ..Defaults::default()
        },
    };
    crowdlens_config::to_dashboard_config(&cfg)?;

    let written: PathBuf = crowdlens_config::save_config(&cfg)?;
    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("\n  Next: crowdlens login <email>");
    Ok(())
}

fn toml_text(cfg: &Config) -> Result<String, CliError> {
    toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("failed to serialize config: {e}"),
    })
}

fn parse<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

fn set_key(cfg: &mut Config, key: &str, value: String) -> Result<(), CliError> {
    let key = key.replace('-', "_");
    let d = &mut cfg.defaults;
    match key.trim_start_matches("defaults.") {
        "api_url" => cfg.api_url = Some(value),
        "socket_url" => cfg.socket_url = Some(value).filter(|v| !v.is_empty()),
        "output" => d.output = value,
        "color" => d.color = value,
        "insecure" => d.insecure = parse(&key, &value, "'true' or 'false'")?,
        "ca_cert" => d.ca_cert = Some(value).filter(|v| !v.is_empty()).map(PathBuf::from),
        "timeout" => d.timeout = parse(&key, &value, "a number of seconds")?,
        "refresh_interval" => d.refresh_interval = value,
        "page_size" => d.page_size = parse(&key, &value, "a positive number")?,
        "reconnect_attempts" => d.reconnect_attempts = parse(&key, &value, "a number")?,
        "reconnect_delay" => d.reconnect_delay = value,
        "websocket" => d.websocket = parse(&key, &value, "'true' or 'false'")?,
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: api_url, socket_url, output, \
                     color, insecure, ca_cert, timeout, refresh_interval, page_size, \
                     reconnect_attempts, reconnect_delay, websocket"
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_accepts_plain_and_dotted_keys() {
        let mut cfg = Config::default();
        set_key(&mut cfg, "api-url", "https://h/api".into()).unwrap_or_else(|e| panic!("{e}"));
        set_key(&mut cfg, "defaults.page_size", "25".into()).unwrap_or_else(|e| panic!("{e}"));
        set_key(&mut cfg, "websocket", "false".into()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(cfg.api_url.as_deref(), Some("https://h/api"));
        assert_eq!(cfg.defaults.page_size, 25);
        assert!(!cfg.defaults.websocket);
    }

    #[test]
    fn set_rejects_bad_values_and_keys() {
        let mut cfg = Config::default();
        assert!(matches!(
            set_key(&mut cfg, "timeout", "soon".into()),
            Err(CliError::Validation { .. })
        ));
        assert!(matches!(
            set_key(&mut cfg, "profile", "x".into()),
            Err(CliError::Validation { .. })
        ));
    }
}

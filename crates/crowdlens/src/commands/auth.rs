//! Login / logout handlers.

use std::io::{BufRead, IsTerminal};

use dialoguer::Input;
use secrecy::SecretString;

use crowdlens_core::Dashboard;

use crate::cli::{GlobalOpts, LoginArgs, LogoutArgs};
use crate::error::{CliError, prompt_err};

pub async fn login(
    dashboard: &Dashboard,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = match args.email {
        Some(email) => email,
        None => prompt_email(dashboard.user_email())?,
    };
    let password = resolve_password(&email, args.password_stdin)?;

    dashboard.login(&email, &password).await?;

    if args.remember {
        if let Err(e) = crowdlens_config::store_password(&email, &password) {
            tracing::warn!(error = %e, "could not store password in keyring");
        }
    }

    if !global.quiet {
        let who = dashboard.user_email().unwrap_or(email);
        eprintln!("✓ Logged in as {who} ({})", dashboard.user_initials());
    }
    Ok(())
}

pub async fn logout(
    dashboard: &Dashboard,
    args: &LogoutArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let email = dashboard.user_email();
    dashboard.logout().await?;

    if args.forget_password {
        if let Some(ref email) = email {
            crowdlens_config::delete_password(email)?;
        }
    }

    if !global.quiet {
        match email {
            Some(email) => eprintln!("✓ Logged out {email}"),
            None => eprintln!("✓ Logged out"),
        }
    }
    Ok(())
}

fn prompt_email(last: Option<String>) -> Result<String, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractive {
            what: "login".into(),
            hint: "Pass the email: crowdlens login <email>".into(),
        });
    }
    let mut input = Input::<String>::new().with_prompt("Email");
    if let Some(last) = last {
        input = input.default(last);
    }
    input.interact_text().map_err(prompt_err)
}

/// `--password-stdin`, then env / keyring, then an interactive prompt.
fn resolve_password(email: &str, from_stdin: bool) -> Result<SecretString, CliError> {
    if from_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        let password = line.trim_end_matches(['\r', '\n']);
        if password.is_empty() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "nothing was read from stdin".into(),
            });
        }
        return Ok(SecretString::from(password.to_owned()));
    }

    if let Some(password) = crowdlens_config::resolve_password(email) {
        tracing::debug!(email, "using stored password");
        return Ok(password);
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractive {
            what: "password prompt".into(),
            hint: format!(
                "Use --password-stdin or set {}.",
                crowdlens_config::PASSWORD_ENV
            ),
        });
    }
    let password = rpassword::prompt_password(format!("Password for {email}: "))?;
    Ok(SecretString::from(password))
}

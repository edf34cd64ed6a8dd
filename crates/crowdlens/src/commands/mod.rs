//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod alerts;
pub mod auth;
pub mod config_cmd;
pub mod dashboard;
pub mod entries;
pub mod sites;
pub mod util;
pub mod watch;

use crowdlens_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(dashboard, args, global).await,
        Command::Logout(args) => auth::logout(dashboard, &args, global).await,
        Command::Sites(args) => sites::handle(dashboard, args, global).await,
        Command::Dashboard(args) => dashboard::handle(dashboard, &args, global).await,
        Command::Entries(args) => entries::handle(dashboard, &args, global).await,
        Command::Watch(args) => watch::handle(dashboard, &args, global).await,
        Command::Alerts(args) => alerts::handle(dashboard, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

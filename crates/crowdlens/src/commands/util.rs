//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crowdlens_core::{Dashboard, DateFilter, Site};

use crate::cli::{FilterArg, GlobalOpts};
use crate::error::{CliError, prompt_err};

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractive {
            what: message.into(),
            hint: "Use --yes (-y) to skip confirmation in non-interactive contexts.".into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

impl From<FilterArg> for DateFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Today => Self::Today,
            FilterArg::Yesterday => Self::Yesterday,
            FilterArg::Week => Self::Week,
            FilterArg::Month => Self::Month,
        }
    }
}

/// Stderr spinner, hidden under `--quiet` or when stderr is not a terminal.
pub fn spinner(message: &str, global: &GlobalOpts) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_owned());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub fn require_login(dashboard: &Dashboard) -> Result<(), CliError> {
    if dashboard.is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

/// Load sites, then apply `--site` (id, or name ignoring case) when given.
///
/// The directory already falls back to the stored or first site.
pub async fn load_and_select(
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<Arc<Site>, CliError> {
    require_login(dashboard)?;
    let sites = dashboard.load_sites().await?;

    if let Some(ref wanted) = global.site {
        let site = find_site(&sites, wanted).ok_or_else(|| CliError::NotFound {
            resource_type: "site".into(),
            identifier: wanted.clone(),
            list_command: "sites list".into(),
        })?;
        return Ok(dashboard.directory().set_selected_site(&site.site_id)?);
    }

    dashboard.selected_site().ok_or(CliError::NoSites)
}

pub fn find_site<'a>(sites: &'a [Site], wanted: &str) -> Option<&'a Site> {
    sites
        .iter()
        .find(|s| s.site_id == wanted)
        .or_else(|| sites.iter().find(|s| s.name.eq_ignore_ascii_case(wanted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_lookup_prefers_id_then_name() {
        let sites = vec![
            Site::new("mall", "Harbor Mall", vec![]),
            Site::new("s2", "mall", vec![]),
        ];
        assert_eq!(find_site(&sites, "mall").map(|s| s.name.as_str()), Some("Harbor Mall"));
        assert_eq!(find_site(&sites, "HARBOR MALL").map(|s| s.site_id.as_str()), Some("mall"));
        assert!(find_site(&sites, "nowhere").is_none());
    }

    #[test]
    fn filter_arg_maps_to_date_filter() {
        assert_eq!(DateFilter::from(FilterArg::Week), DateFilter::Week);
        assert_eq!(DateFilter::from(FilterArg::default()), DateFilter::Today);
    }
}

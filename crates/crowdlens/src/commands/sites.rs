//! Site command handlers.

use std::io::IsTerminal;

use dialoguer::Select;
use tabled::Tabled;

use crowdlens_core::{Dashboard, Site};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::error::{CliError, prompt_err};
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "")]
    selected: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Zones")]
    zones: String,
}

fn row(site: &Site, selected: Option<&str>) -> SiteRow {
    let location = [site.city.as_deref(), site.country.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    SiteRow {
        selected: if selected == Some(site.site_id.as_str()) {
            "*"
        } else {
            ""
        },
        id: site.site_id.clone(),
        name: site.name.clone(),
        location,
        zones: site
            .zones
            .iter()
            .map(|z| z.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: SitesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::require_login(dashboard)?;
    match args.command {
        SitesCommand::List => {
            let sites = dashboard.load_sites().await?;
            let selected = dashboard.selected_site();
            let selected_id = selected.as_ref().map(|s| s.site_id.as_str());
            let out = output::render_list(
                &global.output,
                &sites,
                |s| row(s, selected_id),
                |s| s.site_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SitesCommand::Select { site } => {
            let sites = dashboard.load_sites().await?;
            let wanted = site.or_else(|| global.site.clone());
            let site_id = match wanted {
                Some(wanted) => util::find_site(&sites, &wanted)
                    .map(|s| s.site_id.clone())
                    .ok_or_else(|| CliError::NotFound {
                        resource_type: "site".into(),
                        identifier: wanted,
                        list_command: "sites list".into(),
                    })?,
                None => pick_site(&sites, dashboard)?,
            };

            let site = dashboard.directory().set_selected_site(&site_id)?;
            if !global.quiet {
                eprintln!("✓ Selected site '{}' ({})", site.name, site.site_id);
            }
            Ok(())
        }
    }
}

fn pick_site(sites: &[Site], dashboard: &Dashboard) -> Result<String, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractive {
            what: "sites select".into(),
            hint: "Pass the site: crowdlens sites select <id>".into(),
        });
    }
    let current = dashboard
        .selected_site()
        .and_then(|s| sites.iter().position(|x| x.site_id == s.site_id))
        .unwrap_or(0);
    let labels: Vec<String> = sites
        .iter()
        .map(|s| format!("{} ({})", s.name, s.site_id))
        .collect();
    let index = Select::new()
        .with_prompt("Site")
        .items(&labels)
        .default(current)
        .interact()
        .map_err(prompt_err)?;
    sites
        .get(index)
        .map(|s| s.site_id.clone())
        .ok_or_else(|| CliError::Internal(format!("no site at index {index}")))
}

//! Entry/exit log, one page at a time.

use chrono::Local;
use serde::Serialize;
use tabled::Tabled;

use crowdlens_core::format::clock_label;
use crowdlens_core::pagination::render_window;
use crowdlens_core::{Dashboard, EntryLog, EntryRecord, PageMarker, Pager};

use crate::cli::{EntriesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "")]
    initials: String,
    #[tabled(rename = "Person")]
    person: String,
    #[tabled(rename = "Gender")]
    gender: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Exit")]
    exit: String,
    #[tabled(rename = "Dwell")]
    dwell: String,
    #[tabled(rename = "Severity")]
    severity: String,
}

impl From<&EntryRecord> for EntryRow {
    fn from(r: &EntryRecord) -> Self {
        Self {
            initials: r.initials(),
            person: r.person_name.clone().unwrap_or_else(|| r.person_id.clone()),
            gender: r.gender.clone().unwrap_or_default(),
            zone: r.zone.clone().unwrap_or_default(),
            entry: clock_label(r.entry.as_ref(), &Local),
            exit: clock_label(r.exit.as_ref(), &Local),
            dwell: r.dwell_label(),
            severity: r.severity.clone().unwrap_or_default(),
        }
    }
}

/// Structured output: the page plus where it sits.
#[derive(Serialize)]
struct EntriesView<'a> {
    pager: Pager,
    window: Vec<PageMarker>,
    records: &'a [EntryRecord],
}

pub async fn handle(
    dashboard: &Dashboard,
    args: &EntriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let site_id = if args.site_only {
        Some(util::load_and_select(dashboard, global).await?.site_id.clone())
    } else {
        util::require_login(dashboard)?;
        None
    };
    let page_size = args.page_size.unwrap_or(dashboard.config().page_size);
    let mut log = EntryLog::new(dashboard.client().clone(), page_size, site_id);

    log.load().await;
    if args.page != log.pager().current_page() && !log.go_to_page(args.page).await {
        return Err(CliError::Validation {
            field: "page".into(),
            reason: format!(
                "page {} is out of range (1..={})",
                args.page,
                log.pager().total_pages().max(1)
            ),
        });
    }

    let view = EntriesView {
        pager: *log.pager(),
        window: log.window(),
        records: &log.page().records,
    };
    let out = output::render_single(&global.output, &view, detail, |v| {
        v.records
            .iter()
            .map(|r| r.person_id.clone())
            .collect::<Vec<_>>()
            .join("\n")
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(view: &EntriesView<'_>) -> String {
    let Some((first, last)) = view.pager.showing() else {
        return "No entries".into();
    };
    let rows: Vec<EntryRow> = view.records.iter().map(EntryRow::from).collect();
    format!(
        "{}\nShowing {first}-{last} of {}   {}",
        output::render_table(&rows),
        view.pager.total_records(),
        render_window(&view.window, view.pager.current_page()),
    )
}

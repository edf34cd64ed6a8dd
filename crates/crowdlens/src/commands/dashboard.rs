//! One-shot analytics snapshot for the selected site.

use chrono::{Local, TimeZone, Utc};

use crowdlens_core::format::{DwellUnit, clock_label, dwell_label};
use crowdlens_core::{AnalyticsSnapshot, Comparison, Dashboard, DateFilter, Site};

use crate::cli::{DashboardArgs, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

/// Trend points shown in the table view.
const TREND_POINTS: usize = 6;

pub async fn handle(
    dashboard: &Dashboard,
    args: &DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let site = util::load_and_select(dashboard, global).await?;

    let spinner = util::spinner(&format!("Loading analytics for {}", site.name), global);
    let loaded = dashboard.set_date_filter(DateFilter::from(args.filter)).await;
    spinner.finish_and_clear();
    loaded?;

    let snapshot = dashboard
        .analytics()
        .ok_or_else(|| CliError::Internal("analytics were not loaded".into()))?;

    let painter = Painter::new(&global.color);
    let out = output::render_single(
        &global.output,
        snapshot.as_ref(),
        |s| detail(s, &site, painter),
        |s| format!("{:.0}", s.occupancy),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub(crate) fn detail(s: &AnalyticsSnapshot, site: &Site, painter: Painter) -> String {
    let mut lines = vec![
        painter.bold(&format!("{} ({})", site.name, site.site_id)),
        painter.dim(&format!("{} · {}", s.filter, range_label(s))),
        String::new(),
        format!(
            "Occupancy:   {:.0}{}",
            s.occupancy,
            change_suffix(s.occupancy_comparison.as_ref())
        ),
        format!("Footfall:    {}", s.footfall),
        format!(
            "Avg dwell:   {}{}",
            dwell_label(s.dwell_minutes, DwellUnit::Minutes),
            change_suffix(s.dwell_comparison.as_ref())
        ),
        format!(
            "Total crowd: {:.0} ({}% male, {}% female)",
            s.demographics.total(),
            s.demographics.male_percent(),
            s.demographics.female_percent()
        ),
    ];

    let trend: Vec<String> = s
        .occupancy_series
        .iter()
        .rev()
        .take(TREND_POINTS)
        .rev()
        .map(|p| format!("{} {:.0}", clock_label(p.at.as_ref(), &Local), p.value))
        .collect();
    if !trend.is_empty() {
        lines.push(format!("Trend:       {}", trend.join("  ")));
    }
    lines.join("\n")
}

fn change_suffix(comparison: Option<&Comparison>) -> String {
    comparison.map_or_else(String::new, |c| {
        format!(" ({:+.1}% vs {:.0})", c.change_percent, c.previous)
    })
}

fn range_label(s: &AnalyticsSnapshot) -> String {
    let at = |ms: i64| {
        Utc.timestamp_millis_opt(ms)
            .single()
            .map_or_else(|| ms.to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string())
    };
    format!("{} → {}", at(s.range.from_utc), at(s.range.to_utc))
}

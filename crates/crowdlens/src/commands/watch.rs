//! Live dashboard: analytics header, occupancy, and alerts until Ctrl-C.

use std::collections::HashSet;

use tokio::sync::watch;

use crowdlens_core::{Dashboard, DateFilter, FeedState, PushSignal, SessionState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::Painter;

use super::alerts::alert_line;
use super::dashboard::detail;
use super::util;

pub async fn handle(
    dashboard: &Dashboard,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::require_login(dashboard)?;
    if global.site.is_some() {
        util::load_and_select(dashboard, global).await?;
    }

    let spinner = util::spinner("Starting dashboard", global);
    let started = dashboard.start().await;
    spinner.finish_and_clear();
    started?;

    let filter = DateFilter::from(args.filter);
    if filter != dashboard.date_filter() {
        dashboard.set_date_filter(filter).await?;
    }

    let result = run(dashboard, global).await;
    dashboard.shutdown().await;
    result
}

async fn run(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let painter = Painter::new(&global.color);
    let table = matches!(global.output, OutputFormat::Table);

    let mut feed = dashboard.store().subscribe();
    let mut analytics = dashboard.analytics_updates();
    let mut signals = dashboard.session().signals();
    let mut printer = FeedPrinter::default();

    if table {
        print_header(dashboard, painter);
    }
    printer.print(dashboard, feed.current(), global, painter);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            state = feed.changed() => {
                let Some(state) = state else { break };
                printer.print(dashboard, &state, global, painter);
            }
            Ok(()) = analytics.changed(), if table => print_header(dashboard, painter),
            state = next_state(&mut signals) => {
                if table {
                    eprintln!("{}", painter.dim(&format!("live feed: {}", state_label(state))));
                }
                if state == SessionState::Disconnected {
                    tracing::warn!("live feed closed");
                }
            }
        }
    }
    Ok(())
}

/// Prints alerts not printed yet, oldest first, and occupancy changes.
#[derive(Default)]
struct FeedPrinter {
    printed: HashSet<String>,
    occupancy: Option<f64>,
}

impl FeedPrinter {
    fn print(
        &mut self,
        dashboard: &Dashboard,
        state: &FeedState,
        global: &GlobalOpts,
        painter: Painter,
    ) {
        let table = matches!(global.output, OutputFormat::Table);

        if table && self.occupancy.is_none_or(|o| (o - state.occupancy).abs() > f64::EPSILON) {
            self.occupancy = Some(state.occupancy);
            println!("{}", painter.bold(&format!("Occupancy now: {:.0}", state.occupancy)));
        }

        for alert in state.alerts.iter().rev() {
            if !self.printed.insert(alert.id.clone()) {
                continue;
            }
            println!("{}", alert_line(alert, &global.output, painter));
            dashboard.store().mark_seen(&alert.id);
        }
    }
}

fn print_header(dashboard: &Dashboard, painter: Painter) {
    let (Some(site), Some(snapshot)) = (dashboard.selected_site(), dashboard.analytics()) else {
        return;
    };
    println!("{}\n", detail(&snapshot, &site, painter));
}

/// Next session state change; pends forever without a live feed.
async fn next_state(signals: &mut Option<watch::Receiver<PushSignal>>) -> SessionState {
    let Some(rx) = signals else {
        return std::future::pending().await;
    };
    if rx.changed().await.is_err() {
        *signals = None;
        return SessionState::Disconnected;
    }
    SessionState::from(&*rx.borrow_and_update())
}

fn state_label(state: SessionState) -> String {
    match state {
        SessionState::Disconnected => "disconnected".into(),
        SessionState::Connecting => "connecting".into(),
        SessionState::Connected => "connected".into(),
        SessionState::Reconnecting { attempt } => format!("reconnecting (attempt {attempt})"),
    }
}

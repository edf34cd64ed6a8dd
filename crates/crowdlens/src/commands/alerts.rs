//! Live alert stream.

use chrono::Local;
use tokio_stream::StreamExt;

use crowdlens_core::format::alert_time_label;
use crowdlens_core::{CanonicalAlert, Dashboard};

use crate::cli::{AlertsArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::Painter;

use super::util;

pub async fn handle(
    dashboard: &Dashboard,
    args: &AlertsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Zone names come from the directory; load it before the first alert.
    let site = util::load_and_select(dashboard, global).await?;

    let session = dashboard.session();
    let subscription = session.on_alert();
    session.connect()?;
    if !global.quiet {
        eprintln!("Listening for alerts ({}), Ctrl-C to stop", site.name);
    }

    let painter = Painter::new(&global.color);
    let limit = args.limit.unwrap_or(usize::MAX);
    let mut alerts = Box::pin(subscription.into_stream().take(limit));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = alerts.next() => {
                let Some(alert) = next else { break };
                println!("{}", alert_line(&alert, &global.output, painter));
            }
        }
    }

    session.disconnect();
    Ok(())
}

/// One alert as a line of the selected output format.
pub(crate) fn alert_line(alert: &CanonicalAlert, format: &OutputFormat, painter: Painter) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(alert).unwrap_or_else(|e| {
                tracing::error!(error = %e, "alert serialization failed");
                String::new()
            })
        }
        OutputFormat::Yaml => serde_yaml::to_string(alert)
            .map(|doc| format!("---\n{}", doc.trim_end()))
            .unwrap_or_default(),
        OutputFormat::Plain => alert.id.clone(),
        OutputFormat::Table => {
            let zone = if alert.zone.is_empty() {
                "unknown zone"
            } else {
                alert.zone.as_str()
            };
            format!(
                "{}  {:<6}  {:<5}  {}{}",
                painter.dim(&alert_time_label(&alert.timestamp, &Local::now())),
                painter.severity(alert.severity),
                painter.action(alert.action_type),
                painter.bold(zone),
                if alert.site.is_empty() {
                    String::new()
                } else {
                    format!(" @ {}", alert.site)
                },
            )
        }
    }
}

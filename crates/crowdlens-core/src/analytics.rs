// ── Analytics snapshot ──
//
// Fetches the four dashboard aggregates concurrently and folds whichever
// response shape the backend returned into one `AnalyticsSnapshot`. A failed
// request contributes an empty result; it never blocks the other three.

use chrono::{DateTime, Utc};
use crowdlens_api::models::{
    DemographicsResponse, DwellResponse, FootfallResponse, OccupancyResponse,
};
use crowdlens_api::{ApiClient, Error as ApiError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{
    AnalyticsSnapshot, Comparison, DateFilter, GenderPoint, GenderSplit, SeriesPoint,
};
use crate::time::parse_instant;

/// Load all metrics for `site_id` under `filter`, as seen at `now`.
pub async fn fetch_snapshot(
    client: &ApiClient,
    site_id: &str,
    filter: DateFilter,
    now: DateTime<Utc>,
) -> AnalyticsSnapshot {
    let range = filter.range(now);
    let footfall_range = filter.footfall_range(now);
    debug!(site_id, %filter, from = range.from_utc, to = range.to_utc, "fetching analytics");

    let (occupancy, footfall, dwell, demographics) = tokio::join!(
        client.occupancy(site_id, range),
        client.footfall(site_id, footfall_range),
        client.dwell(site_id, range),
        client.demographics(site_id, range),
    );

    let occupancy = settle("occupancy", occupancy);
    let footfall = settle("footfall", footfall);
    let dwell = settle("dwell", dwell);
    let demographics = settle("demographics", demographics);

    let (current_occupancy, occupancy_series) = occupancy_metrics(&occupancy);
    let (gender, gender_series) = demographics_metrics(&demographics);

    AnalyticsSnapshot {
        site_id: site_id.to_owned(),
        filter,
        range,
        occupancy: current_occupancy,
        occupancy_series,
        occupancy_comparison: occupancy.comparison.map(Comparison::from),
        footfall: footfall_count(&footfall),
        dwell_minutes: dwell_minutes(&dwell),
        dwell_comparison: dwell.comparison.map(Comparison::from),
        demographics: gender,
        demographics_series: gender_series,
        fetched_at: now,
    }
}

fn settle<T: Default>(metric: &str, result: Result<T, ApiError>) -> T {
    result.unwrap_or_else(|e| {
        warn!(metric, error = %e, "analytics request failed, using empty result");
        T::default()
    })
}

fn first_instant(candidates: [Option<&Value>; 3]) -> Option<DateTime<Utc>> {
    candidates.into_iter().flatten().find_map(parse_instant)
}

/// Current value and chart series. Buckets win over the timeseries form.
pub(crate) fn occupancy_metrics(response: &OccupancyResponse) -> (f64, Vec<SeriesPoint>) {
    if let Some(buckets) = response.buckets.as_ref().filter(|b| !b.is_empty()) {
        let series = buckets
            .iter()
            .map(|b| SeriesPoint {
                at: first_instant([b.utc.as_ref(), b.local.as_ref(), None]),
                value: b.avg.unwrap_or(0.0),
            })
            .collect::<Vec<_>>();
        let current = buckets.last().and_then(|b| b.avg).unwrap_or(0.0);
        return (current, series);
    }

    let series = response
        .timeseries
        .iter()
        .flatten()
        .map(|p| SeriesPoint {
            at: first_instant([p.timestamp.as_ref(), p.time.as_ref(), p.date.as_ref()]),
            value: p.occupancy.or(p.count).unwrap_or(0.0),
        })
        .collect::<Vec<_>>();
    let current = response
        .current_occupancy
        .or(response.occupancy)
        .or_else(|| series.last().map(|p| p.value))
        .unwrap_or(0.0);
    (current, series)
}

pub(crate) fn footfall_count(response: &FootfallResponse) -> u64 {
    response
        .footfall
        .or(response.today_footfall)
        .or(response.count)
        .unwrap_or(0)
}

pub(crate) fn dwell_minutes(response: &DwellResponse) -> f64 {
    response
        .avg_dwell_minutes
        .or(response.average_dwell_time)
        .or(response.dwell_time)
        .or(response.avg_dwell_time)
        .unwrap_or(0.0)
}

pub(crate) fn demographics_metrics(
    response: &DemographicsResponse,
) -> (GenderSplit, Vec<GenderPoint>) {
    if let Some(buckets) = response.buckets.as_ref().filter(|b| !b.is_empty()) {
        let series = buckets
            .iter()
            .map(|b| GenderPoint {
                at: first_instant([b.utc.as_ref(), b.local.as_ref(), None]),
                male: b.male.unwrap_or(0.0),
                female: b.female.unwrap_or(0.0),
            })
            .collect::<Vec<_>>();
        let current = series.last().map_or_else(GenderSplit::default, |p| GenderSplit {
            male: p.male,
            female: p.female,
        });
        return (current, series);
    }

    let series = response
        .timeseries
        .iter()
        .flatten()
        .map(|p| GenderPoint {
            at: first_instant([p.timestamp.as_ref(), p.time.as_ref(), p.date.as_ref()]),
            male: p.male.unwrap_or(0.0),
            female: p.female.unwrap_or(0.0),
        })
        .collect::<Vec<_>>();
    let current = match &response.current {
        Some(c) => GenderSplit {
            male: c.male.unwrap_or(0.0),
            female: c.female.unwrap_or(0.0),
        },
        None => series.last().map_or_else(GenderSplit::default, |p| GenderSplit {
            male: p.male,
            female: p.female,
        }),
    };
    (current, series)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse<T: serde::de::DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn occupancy_buckets_take_last_avg() {
        let response: OccupancyResponse = parse(json!({
            "buckets": [
                { "utc": 1_709_280_000_000_i64, "avg": 12.5 },
                { "local": "2024-03-01T09:00:00", "avg": 20 },
            ]
        }));
        let (current, series) = occupancy_metrics(&response);
        assert_eq!(current, 20.0);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].at.unwrap().timestamp_millis(), 1_709_280_000_000);
        assert!(series[1].at.is_some());
    }

    #[test]
    fn occupancy_timeseries_fallback_chain() {
        let response: OccupancyResponse = parse(json!({
            "timeseries": [
                { "timestamp": "2024-03-01T08:00:00Z", "occupancy": 4 },
                { "time": "2024-03-01T09:00:00Z", "count": 6 },
            ],
            "currentOccupancy": 9,
        }));
        let (current, series) = occupancy_metrics(&response);
        assert_eq!(current, 9.0);
        assert_eq!(series.iter().map(|p| p.value).collect::<Vec<_>>(), [4.0, 6.0]);

        let response: OccupancyResponse = parse(json!({
            "timeseries": [{ "date": "2024-03-01", "occupancy": 4 }],
        }));
        assert_eq!(occupancy_metrics(&response).0, 4.0);

        let (current, series) = occupancy_metrics(&OccupancyResponse::default());
        assert_eq!(current, 0.0);
        assert!(series.is_empty());
    }

    #[test]
    fn footfall_and_dwell_prefer_primary_fields() {
        let footfall: FootfallResponse = parse(json!({ "todayFootfall": 30, "count": 1 }));
        assert_eq!(footfall_count(&footfall), 30);
        assert_eq!(footfall_count(&FootfallResponse::default()), 0);

        let dwell: DwellResponse = parse(json!({ "dwellTime": 3.5, "avgDwellTime": 9 }));
        assert_eq!(dwell_minutes(&dwell), 3.5);
        let dwell: DwellResponse = parse(json!({ "avgDwellMinutes": 12, "averageDwellTime": 1 }));
        assert_eq!(dwell_minutes(&dwell), 12.0);
    }

    #[test]
    fn demographics_bucket_and_fallback_forms() {
        let response: DemographicsResponse = parse(json!({
            "buckets": [
                { "utc": 1, "male": 1, "female": 2 },
                { "utc": 2, "male": 3, "female": 5 },
            ]
        }));
        let (current, series) = demographics_metrics(&response);
        assert_eq!(current, GenderSplit { male: 3.0, female: 5.0 });
        assert_eq!(series.len(), 2);

        let response: DemographicsResponse = parse(json!({
            "current": { "male": 10 },
            "timeseries": [{ "timestamp": 1, "male": 1, "female": 1 }],
        }));
        let (current, series) = demographics_metrics(&response);
        assert_eq!(current, GenderSplit { male: 10.0, female: 0.0 });
        assert_eq!(series.len(), 1);

        let (current, _) = demographics_metrics(&DemographicsResponse::default());
        assert_eq!(current.total(), 0.0);
    }
}

use chrono::{DateTime, Days, TimeZone, Utc};
use crowdlens_api::TimeRange;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Dashboard date filter.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DateFilter {
    #[default]
    Today,
    Yesterday,
    Week,
    Month,
}

impl DateFilter {
    /// Query window for this filter at `now`. All boundaries are UTC days.
    pub fn range(self, now: DateTime<Utc>) -> TimeRange {
        let now_ms = now.timestamp_millis();
        match self {
            Self::Today => TimeRange {
                from_utc: day_start(now, 0),
                to_utc: now_ms,
            },
            Self::Yesterday => {
                let from_utc = day_start(now, 1);
                TimeRange {
                    from_utc,
                    to_utc: from_utc + DAY_MS - 1,
                }
            }
            Self::Week => TimeRange {
                from_utc: now_ms - 7 * DAY_MS,
                to_utc: now_ms,
            },
            Self::Month => TimeRange {
                from_utc: now_ms - 30 * DAY_MS,
                to_utc: now_ms,
            },
        }
    }

    /// Footfall window: the whole UTC day under `Today`, else [`range`](Self::range).
    pub fn footfall_range(self, now: DateTime<Utc>) -> TimeRange {
        match self {
            Self::Today => {
                let from_utc = day_start(now, 0);
                TimeRange {
                    from_utc,
                    to_utc: from_utc + DAY_MS - 1,
                }
            }
            other => other.range(now),
        }
    }
}

/// Epoch millis of 00:00 UTC, `days_back` days before `now`'s date.
fn day_start(now: DateTime<Utc>, days_back: u64) -> i64 {
    let date = now
        .date_naive()
        .checked_sub_days(Days::new(days_back))
        .unwrap_or(now.date_naive());
    date.and_hms_opt(0, 0, 0)
        .map_or(now.timestamp_millis(), |naive| {
            Utc.from_utc_datetime(&naive).timestamp_millis()
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub previous: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// One chart sample; `at` is `None` when the backend sent no usable time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub at: Option<DateTime<Utc>>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderPoint {
    pub at: Option<DateTime<Utc>>,
    pub male: f64,
    pub female: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenderSplit {
    pub male: f64,
    pub female: f64,
}

impl GenderSplit {
    pub fn total(&self) -> f64 {
        self.male + self.female
    }

    /// Rounded share of men, 0 when nobody was counted.
    pub fn male_percent(&self) -> u32 {
        percent(self.male, self.total())
    }

    pub fn female_percent(&self) -> u32 {
        percent(self.female, self.total())
    }

    /// The larger of the two shares.
    pub fn dominant_percent(&self) -> u32 {
        self.male_percent().max(self.female_percent())
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn percent(part: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 0;
    }
    (part / total * 100.0).round().clamp(0.0, 100.0) as u32
}

/// Metrics for one site and date filter, replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub site_id: String,
    pub filter: DateFilter,
    pub range: TimeRange,
    pub occupancy: f64,
    pub occupancy_series: Vec<SeriesPoint>,
    pub occupancy_comparison: Option<Comparison>,
    pub footfall: u64,
    /// Average dwell, always in minutes.
    pub dwell_minutes: f64,
    pub dwell_comparison: Option<Comparison>,
    pub demographics: GenderSplit,
    pub demographics_series: Vec<GenderPoint>,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn ms(s: &str) -> i64 {
        at(s).timestamp_millis()
    }

    #[test]
    fn today_runs_from_utc_midnight_to_now() {
        let now = at("2024-03-05T14:30:00Z");
        assert_eq!(
            DateFilter::Today.range(now),
            TimeRange {
                from_utc: ms("2024-03-05T00:00:00Z"),
                to_utc: now.timestamp_millis(),
            }
        );
        assert_eq!(
            DateFilter::Today.footfall_range(now),
            TimeRange {
                from_utc: ms("2024-03-05T00:00:00Z"),
                to_utc: ms("2024-03-05T23:59:59.999Z"),
            }
        );
    }

    #[test]
    fn yesterday_is_a_full_day_across_month_boundary() {
        let now = at("2024-03-01T08:00:00Z");
        let range = DateFilter::Yesterday.range(now);
        assert_eq!(range.from_utc, ms("2024-02-29T00:00:00Z"));
        assert_eq!(range.to_utc, ms("2024-02-29T23:59:59.999Z"));
        assert_eq!(DateFilter::Yesterday.footfall_range(now), range);
    }

    #[test]
    fn week_and_month_are_rolling() {
        let now = at("2024-03-05T14:30:00Z");
        assert_eq!(
            DateFilter::Week.range(now).from_utc,
            ms("2024-02-27T14:30:00Z")
        );
        assert_eq!(
            DateFilter::Month.range(now).from_utc,
            ms("2024-02-04T14:30:00Z")
        );
    }

    #[test]
    fn filter_parses_case_insensitively() {
        assert_eq!("WEEK".parse::<DateFilter>().unwrap(), DateFilter::Week);
        assert_eq!(DateFilter::Month.to_string(), "month");
    }

    #[test]
    fn gender_percentages() {
        let split = GenderSplit {
            male: 1.0,
            female: 2.0,
        };
        assert_eq!(split.male_percent(), 33);
        assert_eq!(split.female_percent(), 67);
        assert_eq!(split.dominant_percent(), 67);
        assert_eq!(GenderSplit::default().male_percent(), 0);
    }
}

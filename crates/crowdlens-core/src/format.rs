// Display helpers shared by every front end.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use strum::{Display as StrumDisplay, EnumString};

/// Unit the backend reports dwell in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, StrumDisplay, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DwellUnit {
    #[default]
    Minutes,
    Hours,
}

/// `Today, 9:05 AM`, `Yesterday, 9:05 AM`, or `Mar 3, 9:05 AM`, in `now`'s zone.
pub fn alert_time_label<Tz>(at: &DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = at.with_timezone(&now.timezone());
    let time = local.format("%-I:%M %p");
    let today = now.date_naive();
    let day = local.date_naive();

    if day == today {
        format!("Today, {time}")
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday, {time}")
    } else {
        format!("{}, {time}", local.format("%b %-d"))
    }
}

/// `9:05 AM` in `tz`, or `--` when there is no time.
pub fn clock_label<Tz>(at: Option<&DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.map_or_else(
        || "--".into(),
        |at| at.with_timezone(tz).format("%-I:%M %p").to_string(),
    )
}

/// `08min 30sec` for minutes, `1.5 hrs` for hours.
pub fn dwell_label(value: f64, unit: DwellUnit) -> String {
    match unit {
        DwellUnit::Hours => format!("{value:.1} hrs"),
        DwellUnit::Minutes => {
            let (mins, secs) = split_unit(value, 60.0);
            format!("{mins:02}min {secs:02}sec")
        }
    }
}

/// `HH:MM` for a duration in minutes.
pub fn hours_minutes(minutes: f64) -> String {
    let (hours, mins) = split_unit(minutes / 60.0, 60.0);
    format!("{hours:02}:{mins:02}")
}

/// Whole part and rounded remainder in sub-units, carrying a rounded-up
/// remainder into the whole part.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn split_unit(value: f64, per: f64) -> (u64, u64) {
    let value = value.max(0.0);
    let whole = value.floor();
    let rest = ((value - whole) * per).round();
    let (whole, rest) = (whole as u64, rest as u64);
    let per = per as u64;
    if rest >= per {
        (whole + 1, rest - per)
    } else {
        (whole, rest)
    }
}

/// Initials from a person's full name: first and last word, else the first
/// two characters, `??` when empty.
pub fn name_initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => "??".into(),
        [only] => only.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => first_chars([*first, *last]),
    }
}

/// Initials from the local part of an email, split on `.`, `_`, or `-`.
pub fn user_initials(email: Option<&str>) -> String {
    let Some(email) = email.filter(|e| !e.is_empty()) else {
        return "?".into();
    };
    let local = email.split('@').next().unwrap_or(email);
    let parts: Vec<&str> = local.split(['.', '_', '-']).collect();

    if let [first, second, ..] = parts.as_slice() {
        first_chars([*first, *second])
    } else {
        local.chars().take(2).collect::<String>().to_uppercase()
    }
}

fn first_chars(parts: [&str; 2]) -> String {
    parts
        .iter()
        .filter_map(|p| p.chars().next())
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn alert_labels_relative_to_now() {
        let now = utc("2024-03-05T18:00:00Z");
        assert_eq!(
            alert_time_label(&utc("2024-03-05T09:05:00Z"), &now),
            "Today, 9:05 AM"
        );
        assert_eq!(
            alert_time_label(&utc("2024-03-04T21:30:00Z"), &now),
            "Yesterday, 9:30 PM"
        );
        assert_eq!(
            alert_time_label(&utc("2024-03-01T00:00:00Z"), &now),
            "Mar 1, 12:00 AM"
        );
    }

    #[test]
    fn alert_labels_use_the_reference_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let now = utc("2024-03-05T20:00:00Z").with_timezone(&ist);
        // 19:00 UTC is already 00:30 the next day in +05:30.
        assert_eq!(
            alert_time_label(&utc("2024-03-05T19:00:00Z"), &now),
            "Today, 12:30 AM"
        );
    }

    #[test]
    fn dwell_labels() {
        assert_eq!(dwell_label(8.5, DwellUnit::Minutes), "08min 30sec");
        assert_eq!(dwell_label(0.0, DwellUnit::Minutes), "00min 00sec");
        assert_eq!(dwell_label(12.999, DwellUnit::Minutes), "13min 00sec");
        assert_eq!(dwell_label(1.5, DwellUnit::Hours), "1.5 hrs");
    }

    #[test]
    fn hours_minutes_label() {
        assert_eq!(hours_minutes(135.0), "02:15");
        assert_eq!(hours_minutes(59.6), "01:00");
        assert_eq!(hours_minutes(5.0), "00:05");
    }

    #[test]
    fn initials() {
        assert_eq!(name_initials("Ada King Lovelace"), "AL");
        assert_eq!(name_initials("cher"), "CH");
        assert_eq!(name_initials("  "), "??");
        assert_eq!(user_initials(Some("jane.doe@example.com")), "JD");
        assert_eq!(user_initials(Some("ops_team@example.com")), "OT");
        assert_eq!(user_initials(Some("admin@example.com")), "AD");
        assert_eq!(user_initials(None), "?");
    }

    #[test]
    fn clock_labels() {
        assert_eq!(clock_label(None, &Utc), "--");
        assert_eq!(
            clock_label(Some(&utc("2024-03-05T16:57:20Z")), &Utc),
            "4:57 PM"
        );
    }
}

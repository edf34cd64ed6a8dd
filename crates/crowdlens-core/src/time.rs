// Timestamp parsing shared by the normalizer and analytics conversion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Interpret a JSON timestamp.
///
/// Numbers and all-digit strings are epoch milliseconds; other strings are
/// RFC 3339, a zone-less ISO date-time (read as UTC), or a bare date.
/// Anything else is `None`.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(truncate_millis))
            .and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_instant_str(s),
        _ => None,
    }
}

pub fn parse_instant_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// `2023-11-14T22:13:20.000Z`
pub fn to_iso_millis(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn truncate_millis(f: f64) -> i64 {
    f.trunc() as i64
}

/// Serde adapter writing timestamps as ISO-8601 with millisecond precision.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::to_iso_millis(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        super::parse_instant_str(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn epoch_millis_number_and_string() {
        let expected = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        assert_eq!(parse_instant(&json!(1_700_000_000_000_i64)), Some(expected));
        assert_eq!(parse_instant(&json!("1700000000000")), Some(expected));
        assert_eq!(parse_instant(&json!(1.7e12)), Some(expected));
    }

    #[test]
    fn iso_variants() {
        let expected = DateTime::parse_from_rfc3339("2024-03-01T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_instant(&json!("2024-03-01T10:15:00Z")), Some(expected));
        assert_eq!(parse_instant(&json!("2024-03-01T11:15:00+01:00")), Some(expected));
        assert_eq!(parse_instant(&json!("2024-03-01T10:15:00")), Some(expected));
        assert!(parse_instant(&json!("2024-03-01")).is_some());
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_instant(&json!("yesterday-ish")), None);
        assert_eq!(parse_instant(&json!("")), None);
        assert_eq!(parse_instant(&json!(true)), None);
        assert_eq!(parse_instant(&Value::Null), None);
    }

    #[test]
    fn iso_millis_format() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        assert_eq!(to_iso_millis(&at), "2023-11-14T22:13:20.000Z");
    }
}

//! Raw push payload -> canonical records.
//!
//! Live events arrive with no fixed schema. All of the field guessing lives
//! here: the rest of the crate only ever sees [`CanonicalAlert`] and
//! [`OccupancyEvent`]. Normalization never fails; malformed input degrades
//! to a best-effort record.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::directory::ZoneDirectory;
use crate::model::{ActionType, CanonicalAlert, OccupancyEvent, Severity};
use crate::time::parse_instant;

/// Zone-bearing keys, highest priority first.
const ZONE_KEYS: [&str; 7] = [
    "zone", "zoneId", "zoneName", "location", "zone_id", "fromZone", "toZone",
];

/// Containers searched when no top-level zone key is set.
const NESTED_KEYS: [&str; 3] = ["data", "payload", "metadata"];

/// Normalize `raw` against `directory`, using the wall clock for fallbacks.
pub fn normalize(raw: &Value, directory: &ZoneDirectory) -> CanonicalAlert {
    normalize_at(raw, directory, Utc::now())
}

/// Normalize with an explicit "now" for the timestamp and id fallbacks.
pub fn normalize_at(raw: &Value, directory: &ZoneDirectory, now: DateTime<Utc>) -> CanonicalAlert {
    let empty = Map::new();
    let event = raw.as_object().unwrap_or(&empty);

    let alert = CanonicalAlert {
        id: event_id(event, now),
        action_type: action_type(event),
        zone: zone_label(event, directory),
        site: text(event, "site")
            .or_else(|| text(event, "siteId"))
            .unwrap_or_default(),
        severity: severity(event),
        timestamp: timestamp(event).unwrap_or(now),
        dismissed: false,
    };
    trace!(id = %alert.id, zone = %alert.zone, action = %alert.action_type, "alert normalized");
    alert
}

/// Shape-check a `liveOccupancy` payload. Only a numeric `occupancy` is required.
pub fn parse_occupancy(raw: &Value) -> Option<OccupancyEvent> {
    let event = raw.as_object()?;
    let Some(occupancy) = event.get("occupancy").and_then(Value::as_f64) else {
        debug!("dropping occupancy event without numeric occupancy");
        return None;
    };

    Some(OccupancyEvent {
        zone: text(event, "zone"),
        floor: text(event, "floor"),
        site: text(event, "site")
            .or_else(|| text(event, "siteId"))
            .unwrap_or_default(),
        occupancy,
        timestamp: event.get("timestamp").and_then(parse_instant),
    })
}

// ── Field access ─────────────────────────────────────────────────────

/// String or number value of `key`; empty strings count as absent.
fn text(event: &Map<String, Value>, key: &str) -> Option<String> {
    match event.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_zone_value(event: &Map<String, Value>) -> Option<String> {
    ZONE_KEYS.iter().find_map(|key| text(event, key))
}

// ── Zone ─────────────────────────────────────────────────────────────

fn zone_label(event: &Map<String, Value>, directory: &ZoneDirectory) -> String {
    let extracted = first_zone_value(event).or_else(|| {
        NESTED_KEYS
            .iter()
            .filter_map(|key| event.get(*key).and_then(Value::as_object))
            .find_map(first_zone_value)
    });

    if let Some(candidate) = extracted {
        let candidate = candidate.trim();
        if !candidate.is_empty() {
            return resolve_candidate(candidate, directory);
        }
    }

    if let Some(name) = zone_from_direction(event, directory) {
        return name.to_owned();
    }

    let site = event.get("site").and_then(Value::as_str);
    let site_id = event.get("siteId").and_then(Value::as_str);
    directory
        .match_site(site, site_id)
        .map(|s| format!("{} (Zone Unknown)", s.name))
        .unwrap_or_default()
}

fn resolve_candidate(candidate: &str, directory: &ZoneDirectory) -> String {
    directory
        .resolve(candidate)
        .or_else(|| directory.resolve_by_name(candidate))
        .or_else(|| directory.resolve_partial(candidate))
        .unwrap_or(candidate)
        .to_owned()
}

/// `"<zoneId>-exit"` style directions carry the zone as the first token.
fn zone_from_direction<'a>(
    event: &Map<String, Value>,
    directory: &'a ZoneDirectory,
) -> Option<&'a str> {
    let direction = event.get("direction")?.as_str()?;
    let mut parts = direction.split('-');
    let token = parts.next()?;
    parts.next()?;
    if token == "zone" {
        return None;
    }
    directory.resolve(token)
}

// ── Action / severity / time / id ────────────────────────────────────

fn action_type(event: &Map<String, Value>) -> ActionType {
    if let Some(action) = event
        .get("actionType")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<ActionType>().ok())
    {
        return action;
    }

    let direction = event
        .get("direction")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .unwrap_or_default();
    if direction.contains("exit") {
        ActionType::Exit
    } else if direction.contains("entry") || direction.contains("enter") {
        ActionType::Entry
    } else {
        ActionType::Exit
    }
}

fn severity(event: &Map<String, Value>) -> Severity {
    event
        .get("severity")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_default()
}

fn timestamp(event: &Map<String, Value>) -> Option<DateTime<Utc>> {
    let present = |v: &&Value| match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    };
    event
        .get("timestamp")
        .filter(present)
        .or_else(|| event.get("ts"))
        .and_then(parse_instant)
}

fn event_id(event: &Map<String, Value>, now: DateTime<Utc>) -> String {
    text(event, "eventId").unwrap_or_else(|| {
        let fraction = Uuid::new_v4().as_u128() % 10_u128.pow(16);
        format!("{}-0.{fraction:016}", now.timestamp_millis())
    })
}

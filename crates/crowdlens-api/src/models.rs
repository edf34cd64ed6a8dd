// Wire types for the analytics REST API.
//
// Response shapes drift between backend revisions, so most fields are
// optional and the core crate applies the fallback chains.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Sites ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDto {
    #[serde(deserialize_with = "required_text")]
    pub site_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Entries may be `null`, malformed, or lack an id/name; those come
    /// through as `None` or with empty fields and the directory skips them.
    #[serde(default, deserialize_with = "lenient_zones")]
    pub zones: Option<Vec<Option<ZoneDto>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDto {
    #[serde(default, deserialize_with = "lenient_text")]
    pub zone_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub security_level: Option<String>,
}

/// Strings pass through, numbers are stringified, anything else is absent.
fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn required_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    lenient_text(de)?.ok_or_else(|| D::Error::custom("expected a string or numeric id"))
}

/// One bad zone must not sink the whole site list.
fn lenient_zones<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Option<Vec<Option<ZoneDto>>>, D::Error> {
    let Some(Value::Array(zones)) = Option::<Value>::deserialize(de)? else {
        return Ok(None);
    };
    Ok(Some(
        zones
            .into_iter()
            .map(|zone| serde_json::from_value(zone).ok())
            .collect(),
    ))
}

// ── Analytics ────────────────────────────────────────────────────────

/// Inclusive UTC epoch-millisecond window sent with every analytics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub from_utc: i64,
    pub to_utc: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RangeQuery<'a> {
    pub site_id: &'a str,
    pub from_utc: i64,
    pub to_utc: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDto {
    #[serde(default)]
    pub previous: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellResponse {
    #[serde(default)]
    pub avg_dwell_minutes: Option<f64>,
    #[serde(default)]
    pub average_dwell_time: Option<f64>,
    #[serde(default)]
    pub dwell_time: Option<f64>,
    #[serde(default)]
    pub avg_dwell_time: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub comparison: Option<ComparisonDto>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootfallResponse {
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub footfall: Option<u64>,
    #[serde(default)]
    pub today_footfall: Option<u64>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyResponse {
    #[serde(default)]
    pub buckets: Option<Vec<OccupancyBucket>>,
    #[serde(default)]
    pub timeseries: Option<Vec<OccupancyPoint>>,
    #[serde(default)]
    pub current_occupancy: Option<f64>,
    #[serde(default)]
    pub occupancy: Option<f64>,
    #[serde(default)]
    pub comparison: Option<ComparisonDto>,
}

/// Aggregated bucket; `utc` is usually epoch millis, `local` a display string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccupancyBucket {
    #[serde(default)]
    pub utc: Option<Value>,
    #[serde(default)]
    pub local: Option<Value>,
    #[serde(default)]
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccupancyPoint {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub occupancy: Option<f64>,
    #[serde(default)]
    pub count: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemographicsResponse {
    #[serde(default)]
    pub buckets: Option<Vec<DemographicsBucket>>,
    #[serde(default)]
    pub current: Option<GenderCounts>,
    #[serde(default)]
    pub timeseries: Option<Vec<DemographicsPoint>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemographicsBucket {
    #[serde(default)]
    pub utc: Option<Value>,
    #[serde(default)]
    pub local: Option<Value>,
    #[serde(default)]
    pub male: Option<f64>,
    #[serde(default)]
    pub female: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenderCounts {
    #[serde(default)]
    pub male: Option<f64>,
    #[serde(default)]
    pub female: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemographicsPoint {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
    #[serde(default)]
    pub male: Option<f64>,
    #[serde(default)]
    pub female: Option<f64>,
}

// ── Entry/exit log ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryExitRequest {
    pub page_number: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryExitResponse {
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub records: Option<Vec<EntryExitRecord>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryExitRecord {
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub person_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub entry_utc: Option<i64>,
    #[serde(default)]
    pub entry_local: Option<String>,
    #[serde(default)]
    pub exit_utc: Option<i64>,
    #[serde(default)]
    pub exit_local: Option<String>,
    #[serde(default)]
    pub dwell_minutes: Option<f64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn site_with_sparse_zones() {
        let json = r#"{
            "siteId": "s1",
            "name": "Mall",
            "zones": [
                {"zoneId": "z1", "name": "Lobby", "securityLevel": "low"},
                null,
                {"zoneId": "z2"}
            ]
        }"#;
        let site: SiteDto = serde_json::from_str(json).unwrap();
        let zones = site.zones.unwrap();
        assert_eq!(zones.len(), 3);
        assert!(zones[1].is_none());
        assert_eq!(zones[2].as_ref().unwrap().name, None);
    }

    #[test]
    fn numeric_ids_are_stringified_and_bad_zones_dropped() {
        let json = r#"{
            "siteId": 42,
            "name": "Airport",
            "zones": [
                {"zoneId": "z1", "name": "Lobby"},
                {"zoneId": 7, "name": "Gate 7"},
                {"zoneId": {"nested": true}, "name": "Odd"},
                "not-a-zone"
            ]
        }"#;
        let site: SiteDto = serde_json::from_str(json).unwrap();
        assert_eq!(site.site_id, "42");
        let zones = site.zones.unwrap();
        assert_eq!(zones.len(), 4);
        assert_eq!(zones[1].as_ref().unwrap().zone_id.as_deref(), Some("7"));
        assert_eq!(zones[2].as_ref().unwrap().zone_id, None);
        assert!(zones[3].is_none());
    }

    #[test]
    fn site_with_null_zones() {
        let site: SiteDto =
            serde_json::from_str(r#"{"siteId":"s1","name":"Mall","zones":null}"#).unwrap();
        assert!(site.zones.is_none());
    }

    #[test]
    fn entry_exit_missing_records() {
        let resp: EntryExitResponse =
            serde_json::from_str(r#"{"totalRecords": 3, "totalPages": 1}"#).unwrap();
        assert!(resp.records.is_none());
        assert_eq!(resp.total_records, 3);
    }

    #[test]
    fn entry_exit_request_omits_missing_site() {
        let req = EntryExitRequest {
            page_number: 2,
            page_size: 10,
            site_id: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({"pageNumber": 2, "pageSize": 10})
        );
    }
}

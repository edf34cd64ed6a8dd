// ── API-to-domain type conversions ──
//
// Bridges raw `crowdlens_api` response types into canonical `model` types.

use chrono::DateTime;
use crowdlens_api::models::{ComparisonDto, EntryExitRecord, SiteDto, ZoneDto};
use tracing::warn;

use crate::model::{Comparison, EntryRecord, Site, Zone};

// ── Sites ────────────────────────────────────────────────────────────

impl From<SiteDto> for Site {
    fn from(dto: SiteDto) -> Self {
        let site_id = dto.site_id;
        let zones = dto
            .zones
            .unwrap_or_default()
            .into_iter()
            .filter_map(|zone| zone_from_dto(&site_id, zone))
            .collect();

        Site {
            site_id,
            name: dto.name,
            city: dto.city,
            country: dto.country,
            timezone: dto.timezone,
            zones,
        }
    }
}

/// Zones need both an id and a name to be addressable.
fn zone_from_dto(site_id: &str, zone: Option<ZoneDto>) -> Option<Zone> {
    let Some(zone) = zone else {
        warn!(site_id, "skipping null or malformed zone entry");
        return None;
    };
    match (zone.zone_id, zone.name) {
        (Some(zone_id), Some(name)) if !zone_id.is_empty() && !name.is_empty() => Some(Zone {
            zone_id,
            name,
            security_level: zone.security_level,
        }),
        (zone_id, name) => {
            warn!(site_id, ?zone_id, ?name, "skipping zone without id or name");
            None
        }
    }
}

// ── Analytics ────────────────────────────────────────────────────────

impl From<ComparisonDto> for Comparison {
    fn from(dto: ComparisonDto) -> Self {
        Comparison {
            previous: dto.previous,
            change: dto.change,
            change_percent: dto.change_percent,
        }
    }
}

// ── Entry/exit log ───────────────────────────────────────────────────

impl From<EntryExitRecord> for EntryRecord {
    fn from(dto: EntryExitRecord) -> Self {
        EntryRecord {
            person_id: dto.person_id,
            person_name: dto.person_name,
            gender: dto.gender,
            zone: dto.zone_name.or(dto.zone_id),
            severity: dto.severity,
            entry: dto.entry_utc.and_then(DateTime::from_timestamp_millis),
            exit: dto.exit_utc.and_then(DateTime::from_timestamp_millis),
            dwell_minutes: dto.dwell_minutes,
        }
    }
}

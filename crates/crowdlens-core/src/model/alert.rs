use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::time::iso_millis;

/// Whether a person crossed into or out of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ActionType {
    Entry,
    Exit,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

/// An alert after normalization; every field is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAlert {
    pub id: String,
    pub action_type: ActionType,
    /// Resolved zone display name, or `""` when nothing could be resolved.
    pub zone: String,
    pub site: String,
    pub severity: Severity,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// `true` once the user has seen the alert.
    pub dismissed: bool,
}

/// A `liveOccupancy` push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    pub site: String,
    pub occupancy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

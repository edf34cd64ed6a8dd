use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the entry/exit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub person_id: String,
    pub person_name: Option<String>,
    pub gender: Option<String>,
    pub zone: Option<String>,
    pub severity: Option<String>,
    pub entry: Option<DateTime<Utc>>,
    pub exit: Option<DateTime<Utc>>,
    pub dwell_minutes: Option<f64>,
}

impl EntryRecord {
    /// Dwell as `HH:MM`, or `--` while the person is still inside.
    pub fn dwell_label(&self) -> String {
        match self.dwell_minutes {
            Some(minutes) if minutes > 0.0 && self.exit.is_some() => {
                crate::format::hours_minutes(minutes)
            }
            _ => "--".into(),
        }
    }

    pub fn initials(&self) -> String {
        crate::format::name_initials(self.person_name.as_deref().unwrap_or(""))
    }
}

/// One fetched page plus the totals the pager needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPage {
    pub page_number: u32,
    pub total_records: u64,
    pub total_pages: u32,
    pub records: Vec<EntryRecord>,
}

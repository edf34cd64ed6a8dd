// ── Domain model ──
//
// Canonical types consumed by the CLI. Wire shapes from `crowdlens-api` are
// converted in `convert.rs`; nothing downstream sees a DTO.

pub mod alert;
pub mod analytics;
pub mod entry;
pub mod site;

pub use alert::{ActionType, CanonicalAlert, OccupancyEvent, Severity};
pub use analytics::{AnalyticsSnapshot, Comparison, DateFilter, GenderSplit, GenderPoint, SeriesPoint};
pub use entry::{EntryPage, EntryRecord};
pub use site::{Site, Zone};

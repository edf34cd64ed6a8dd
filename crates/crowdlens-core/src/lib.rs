//! Live occupancy dashboard core, between `crowdlens-api` and the CLI.
//!
//! - **[`Dashboard`]**: facade owning the REST client, persisted client
//!   state, and background tasks. [`start()`](Dashboard::start) loads sites
//!   and analytics, opens the live feed, and keeps analytics fresh.
//!
//! - **[`ReferenceDirectory`]**: sites and the `zoneId -> name` lookup,
//!   rebuilt wholesale on every site load.
//!
//! - **[`normalize`](normalize::normalize)**: turns a shape-unknown push
//!   payload into a [`CanonicalAlert`]. Never fails.
//!
//! - **[`LiveFeedSession`]**: push-channel lifecycle plus scoped
//!   subscriptions that detach individually on drop.
//!
//! - **[`AlertStore`]**: newest-first alerts and the latest occupancy value,
//!   observable through [`FeedStream`].
//!
//! - **[`Pager`]** / [`page_window`]: page-number windowing for the
//!   entry/exit log.

pub mod analytics;
pub mod config;
pub mod convert;
pub mod dashboard;
pub mod directory;
pub mod entries;
pub mod error;
pub mod format;
pub mod model;
pub mod normalize;
pub mod pagination;
pub mod session;
pub mod state;
pub mod store;
pub mod stream;
pub mod time;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DashboardConfig, ReconnectPolicy, TlsVerification};
pub use dashboard::Dashboard;
pub use directory::{ReferenceDirectory, ZoneDirectory};
pub use entries::EntryLog;
pub use error::CoreError;
pub use pagination::{PageMarker, Pager, page_window};
pub use session::{LiveEvent, LiveFeedSession, SessionState};
pub use state::{ClientState, MemoryClientState};
pub use store::{AlertStore, FeedState};
pub use stream::FeedStream;

pub use crowdlens_api::{PushSignal, TimeRange};

pub use model::{
    ActionType, AnalyticsSnapshot, CanonicalAlert, Comparison, DateFilter, EntryPage, EntryRecord,
    GenderPoint, GenderSplit, OccupancyEvent, SeriesPoint, Severity, Site, Zone,
};

//! Reference directory: the loaded sites and their zone lookup.
//!
//! A [`ZoneDirectory`] is an immutable value built from one site list.
//! [`ReferenceDirectory`] owns the current one and swaps in a fresh value on
//! every load, so readers holding a snapshot never observe a half-built map
//! and ids from a previous load cannot linger.

use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::Site;
use crate::state::ClientState;

// ── ZoneDirectory ────────────────────────────────────────────────────

/// Sites plus a `zoneId -> name` map in load order.
#[derive(Debug, Clone, Default)]
pub struct ZoneDirectory {
    sites: Vec<Site>,
    zones: IndexMap<String, String>,
}

impl ZoneDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the lookup from `sites`. Zones lacking an id or a name are
    /// skipped; a repeated id keeps its first position and the last name.
    pub fn from_sites(sites: Vec<Site>) -> Self {
        let mut zones = IndexMap::new();
        for site in &sites {
            for zone in &site.zones {
                if zone.zone_id.is_empty() || zone.name.is_empty() {
                    warn!(site_id = %site.site_id, zone_id = %zone.zone_id, "skipping incomplete zone");
                    continue;
                }
                zones.insert(zone.zone_id.clone(), zone.name.clone());
            }
        }
        debug!(sites = sites.len(), zones = zones.len(), "zone directory built");
        Self { sites, zones }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, site_id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.site_id == site_id)
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Exact zone id lookup.
    pub fn resolve(&self, zone_id: &str) -> Option<&str> {
        self.zones.get(zone_id).map(String::as_str)
    }

    /// Case-insensitive zone name lookup, returning the canonical casing.
    pub fn resolve_by_name(&self, candidate: &str) -> Option<&str> {
        let needle = candidate.to_lowercase();
        self.zones
            .values()
            .find(|name| name.to_lowercase() == needle)
            .map(String::as_str)
    }

    /// First zone whose id or name contains `candidate`, ignoring case.
    pub fn resolve_partial(&self, candidate: &str) -> Option<&str> {
        let needle = candidate.to_lowercase();
        self.zones
            .iter()
            .find(|(id, name)| {
                id.to_lowercase().contains(&needle) || name.to_lowercase().contains(&needle)
            })
            .map(|(_, name)| name.as_str())
    }

    /// Site matched by id (against `site` or `site_id`) or by name (against `site`).
    pub fn match_site(&self, site: Option<&str>, site_id: Option<&str>) -> Option<&Site> {
        self.sites.iter().find(|s| {
            site == Some(s.site_id.as_str())
                || site_id == Some(s.site_id.as_str())
                || site == Some(s.name.as_str())
        })
    }
}

// ── ReferenceDirectory ───────────────────────────────────────────────

/// Owner of the current [`ZoneDirectory`] and the selected site.
///
/// The selection is persisted through [`ClientState`] so it survives restarts.
pub struct ReferenceDirectory {
    current: ArcSwap<ZoneDirectory>,
    selected: ArcSwapOption<Site>,
    state: Arc<dyn ClientState>,
}

impl ReferenceDirectory {
    pub fn new(state: Arc<dyn ClientState>) -> Self {
        Self {
            current: ArcSwap::from_pointee(ZoneDirectory::empty()),
            selected: ArcSwapOption::empty(),
            state,
        }
    }

    /// Replace the directory with one built from `sites`, then select the
    /// stored site if it is still listed, else the first site.
    pub fn load(&self, sites: Vec<Site>) -> Arc<ZoneDirectory> {
        let directory = Arc::new(ZoneDirectory::from_sites(sites));
        self.current.store(Arc::clone(&directory));

        let stored = self.state.site_id();
        let chosen = stored
            .as_deref()
            .and_then(|id| directory.site(id))
            .or_else(|| directory.sites().first())
            .cloned();

        match chosen {
            Some(site) => {
                info!(site_id = %site.site_id, name = %site.name, "site selected");
                if stored.as_deref() != Some(site.site_id.as_str()) {
                    self.persist_selection(&site.site_id);
                }
                self.selected.store(Some(Arc::new(site)));
            }
            None => {
                warn!("site list is empty");
                self.selected.store(None);
            }
        }

        directory
    }

    /// The current directory value.
    pub fn snapshot(&self) -> Arc<ZoneDirectory> {
        self.current.load_full()
    }

    pub fn list_sites(&self) -> Vec<Site> {
        self.current.load().sites().to_vec()
    }

    pub fn resolve(&self, zone_id: &str) -> Option<String> {
        self.current.load().resolve(zone_id).map(str::to_owned)
    }

    pub fn resolve_by_name(&self, candidate: &str) -> Option<String> {
        self.current
            .load()
            .resolve_by_name(candidate)
            .map(str::to_owned)
    }

    pub fn selected_site(&self) -> Option<Arc<Site>> {
        self.selected.load_full()
    }

    /// Select a listed site and persist the choice.
    pub fn set_selected_site(&self, site_id: &str) -> Result<Arc<Site>, CoreError> {
        let site = self
            .current
            .load()
            .site(site_id)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| CoreError::SiteNotFound {
                identifier: site_id.to_owned(),
            })?;

        self.persist_selection(site_id);
        self.selected.store(Some(Arc::clone(&site)));
        info!(site_id, "site selected");
        Ok(site)
    }

    fn persist_selection(&self, site_id: &str) {
        if let Err(e) = self.state.set_site_id(Some(site_id)) {
            warn!(error = %e, site_id, "could not persist site selection");
        }
    }
}

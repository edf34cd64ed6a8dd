// ── Dashboard controller ──
//
// Wires the pieces together: REST client, persisted client state, reference
// directory, live feed session, and alert store. `start()` loads sites and
// the first analytics snapshot, then runs two background tasks: one applies
// live events to the store in delivery order, the other re-fetches analytics
// on a fixed period without touching the loading flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use crowdlens_api::ApiClient;
use secrecy::SecretString;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::analytics::fetch_snapshot;
use crate::config::DashboardConfig;
use crate::directory::ReferenceDirectory;
use crate::entries::EntryLog;
use crate::error::CoreError;
use crate::format::user_initials;
use crate::model::{AnalyticsSnapshot, DateFilter, Site};
use crate::session::{EventSubscription, LiveEvent, LiveFeedSession};
use crate::state::ClientState;
use crate::store::AlertStore;

/// Entry point for consumers. Cheap to clone.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    client: Arc<ApiClient>,
    state: Arc<dyn ClientState>,
    directory: Arc<ReferenceDirectory>,
    session: LiveFeedSession,
    store: AlertStore,
    analytics: watch::Sender<Option<Arc<AnalyticsSnapshot>>>,
    loading: watch::Sender<bool>,
    filter: watch::Sender<DateFilter>,
    /// Bumped on site change, filter change, and shutdown; results of
    /// fetches started under an older value are dropped.
    generation: AtomicU64,
    cancel: CancellationToken,
    /// Child token for the running background tasks, replaced on each start.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Whether a refresh drives the loading indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    Foreground,
    Silent,
}

impl Dashboard {
    /// Build a dashboard. Does not touch the network.
    pub fn new(config: DashboardConfig, state: Arc<dyn ClientState>) -> Result<Self, CoreError> {
        let client = ApiClient::new(config.api_url.clone(), &config.transport())?;
        client.set_token(state.auth_token());

        let directory = Arc::new(ReferenceDirectory::new(Arc::clone(&state)));
        let session = LiveFeedSession::new(config.clone(), Arc::clone(&state), Arc::clone(&directory));
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(DashboardInner {
                config,
                client: Arc::new(client),
                state,
                directory,
                session,
                store: AlertStore::new(),
                analytics: watch::channel(None).0,
                loading: watch::channel(false).0,
                filter: watch::channel(DateFilter::default()).0,
                generation: AtomicU64::new(0),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Log in and persist the token and user email.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), CoreError> {
        let response = self.inner.client.login(email, password).await.map_err(|e| {
            warn!(error = %e, "login failed");
            match CoreError::from(e) {
                err @ (CoreError::AuthenticationFailed { .. }
                | CoreError::ConnectionFailed { .. }
                | CoreError::Timeout) => err,
                other => CoreError::AuthenticationFailed {
                    message: other.to_string(),
                },
            }
        })?;

        let user_email = response
            .user
            .and_then(|u| u.email)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| email.to_owned());

        self.inner
            .state
            .set_auth_token(Some(SecretString::from(response.token)))?;
        self.inner.state.set_user_email(Some(&user_email))?;
        info!(email = %user_email, "logged in");
        Ok(())
    }

    /// Stop everything and forget the token, site, and email.
    pub async fn logout(&self) -> Result<(), CoreError> {
        self.shutdown().await;
        self.inner.client.set_token(None);
        self.inner.state.clear_all()?;
        info!("logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.is_authenticated()
    }

    pub fn user_email(&self) -> Option<String> {
        self.inner.state.user_email()
    }

    pub fn user_initials(&self) -> String {
        user_initials(self.user_email().as_deref())
    }

    // ── Sites ────────────────────────────────────────────────────────

    /// Fetch the site list and rebuild the directory.
    pub async fn load_sites(&self) -> Result<Vec<Site>, CoreError> {
        let dtos = self.inner.client.list_sites().await.map_err(|e| {
            let err = CoreError::from(e);
            if err.is_auth() {
                warn!(error = %err, "site load rejected");
                err
            } else {
                warn!(error = %err, "site load failed");
                CoreError::SiteLoadFailed {
                    reason: err.to_string(),
                }
            }
        })?;

        let sites: Vec<Site> = dtos.into_iter().map(Site::from).collect();
        if sites.is_empty() {
            error!("no sites available, dashboard cannot continue");
            return Err(CoreError::NoSites);
        }

        let directory = self.inner.directory.load(sites.clone());
        info!(sites = sites.len(), zones = directory.zone_count(), "sites loaded");
        Ok(sites)
    }

    /// Select `site_id` and reload analytics for it.
    pub async fn select_site(&self, site_id: &str) -> Result<Arc<Site>, CoreError> {
        let site = self.inner.directory.set_selected_site(site_id)?;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.refresh().await?;
        Ok(site)
    }

    pub fn selected_site(&self) -> Option<Arc<Site>> {
        self.inner.directory.selected_site()
    }

    // ── Analytics ────────────────────────────────────────────────────

    pub async fn set_date_filter(&self, filter: DateFilter) -> Result<(), CoreError> {
        self.inner.filter.send_replace(filter);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.refresh().await
    }

    pub fn date_filter(&self) -> DateFilter {
        *self.inner.filter.borrow()
    }

    /// Reload analytics with the loading flag raised.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.load_analytics(RefreshMode::Foreground).await
    }

    /// Reload analytics without touching the loading flag.
    pub async fn refresh_silently(&self) -> Result<(), CoreError> {
        self.load_analytics(RefreshMode::Silent).await
    }

    async fn load_analytics(&self, mode: RefreshMode) -> Result<(), CoreError> {
        let site = self.inner.directory.selected_site().ok_or(CoreError::NoSites)?;
        let filter = self.date_filter();
        let generation = self.inner.generation.load(Ordering::SeqCst);

        if mode == RefreshMode::Foreground {
            self.inner.loading.send_replace(true);
        }
        let snapshot = fetch_snapshot(&self.inner.client, &site.site_id, filter, Utc::now()).await;
        if mode == RefreshMode::Foreground {
            self.inner.loading.send_replace(false);
        }

        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!(site_id = %site.site_id, "discarding stale analytics");
            return Ok(());
        }

        self.inner.store.set_occupancy(snapshot.occupancy);
        self.inner.analytics.send_replace(Some(Arc::new(snapshot)));
        Ok(())
    }

    pub fn analytics(&self) -> Option<Arc<AnalyticsSnapshot>> {
        self.inner.analytics.borrow().clone()
    }

    pub fn analytics_updates(&self) -> watch::Receiver<Option<Arc<AnalyticsSnapshot>>> {
        self.inner.analytics.subscribe()
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load sites and analytics, open the live feed, and spawn background tasks.
    pub async fn start(&self) -> Result<(), CoreError> {
        if !self.is_authenticated() {
            warn!("dashboard started without a login");
            return Err(CoreError::NotAuthenticated);
        }

        self.load_sites().await?;
        self.refresh().await?;

        let child = {
            let mut slot = self.inner.cancel_child.lock().await;
            slot.cancel();
            *slot = self.inner.cancel.child_token();
            slot.clone()
        };

        let mut handles = self.inner.task_handles.lock().await;
        for stale in handles.drain(..) {
            let _ = stale.await;
        }

        let events = self.inner.session.on_events();
        self.inner.session.connect()?;
        handles.push(tokio::spawn(event_task(self.clone(), events, child.clone())));

        let period = self.inner.config.refresh_interval;
        if !period.is_zero() {
            handles.push(tokio::spawn(refresh_task(self.clone(), period, child)));
        }

        info!("dashboard started");
        Ok(())
    }

    /// Cancel background tasks and close the live feed. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.session.disconnect();
        debug!("dashboard stopped");
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.inner.client
    }

    pub fn store(&self) -> &AlertStore {
        &self.inner.store
    }

    pub fn directory(&self) -> &Arc<ReferenceDirectory> {
        &self.inner.directory
    }

    pub fn session(&self) -> &LiveFeedSession {
        &self.inner.session
    }

    /// Entry/exit log scoped to the selected site.
    pub fn entry_log(&self) -> EntryLog {
        EntryLog::new(
            Arc::clone(&self.inner.client),
            self.inner.config.page_size,
            self.selected_site().map(|s| s.site_id.clone()),
        )
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Apply live events to the store, one at a time, in delivery order.
async fn event_task(dashboard: Dashboard, mut events: EventSubscription, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    LiveEvent::Alert(alert) => {
                        debug!(id = %alert.id, zone = %alert.zone, "alert received");
                        dashboard.inner.store.insert(alert);
                    }
                    LiveEvent::Occupancy(update) => {
                        dashboard.inner.store.set_occupancy(update.occupancy);
                    }
                }
            }
        }
    }
}

/// Periodic silent analytics refresh. A tick that lands while a refresh is
/// still running is skipped.
async fn refresh_task(dashboard: Dashboard, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Shutdown must not wait out an in-flight request.
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = dashboard.refresh_silently() => {
                        if let Err(e) = result {
                            warn!(error = %e, "background refresh failed");
                        }
                    }
                }
            }
        }
    }
}

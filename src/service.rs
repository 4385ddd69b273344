/*
 * Refresh orchestrator: owns dashboard state and drives fetch cycles
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};
use crate::{
    client::DealsApi,
    events::{log_notice, BusyIndicator, DashboardEvent, Notice, Notifier},
    models::{Deal, DealCategory, GroupingKey, Result, SubscriptionOutcome},
    pipeline::{build_rows, normalize, reduce, ChartSeries, DealRow, DisplayBuckets, HistoryStore},
    settings::{
        AllSettings, FieldError, SaveReport, SettingsForm, SettingsStore, UiSettings,
        MAX_REFRESH_INTERVAL_SECS, MIN_REFRESH_INTERVAL_SECS,
    },
};

const EVENT_CAPACITY: usize = 64;
const PUSH_TITLE: &str = "Arbitrage alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed {
        fetched: usize,
        appended: usize,
        replaced: Vec<DealCategory>,
    },
    /// Another cycle was already in flight; this trigger joined it.
    Coalesced,
}

/// Session state shared by everything that renders deals.
#[derive(Debug)]
pub struct AppState {
    pub history: HistoryStore,
    pub display: DisplayBuckets,
    pub rows: BTreeMap<DealCategory, Vec<DealRow>>,
    pub last_refresh: DateTime<Utc>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            history: HistoryStore::new(),
            display: DisplayBuckets::new(),
            rows: BTreeMap::new(),
            last_refresh: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl AppState {
    fn rebuild_rows(&mut self) {
        let rows = self
            .display
            .iter()
            .map(|(category, deals)| (category, build_rows(category, deals, &self.history)))
            .collect();
        self.rows = rows;
    }

    #[must_use]
    pub fn has_refreshed(&self) -> bool {
        self.last_refresh != DateTime::<Utc>::UNIX_EPOCH
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub deals: BTreeMap<DealCategory, Vec<DealRow>>,
    pub last_refresh: DateTime<Utc>,
    pub state: RefreshState,
    pub busy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunityHistory {
    pub key: GroupingKey,
    pub deals: Vec<Deal>,
    pub chart: ChartSeries,
}

struct AutoRefreshTimer {
    handle: JoinHandle<()>,
    interval_secs: u64,
}

impl Drop for AutoRefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Clears the in-flight flag however the cycle ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DashboardService {
    client: Arc<dyn DealsApi>,
    settings_store: SettingsStore,
    settings: StdRwLock<AllSettings>,
    state: Arc<RwLock<AppState>>,
    in_flight: AtomicBool,
    busy: BusyIndicator,
    events: broadcast::Sender<DashboardEvent>,
    notifier: Arc<dyn Notifier>,
    auto_refresh: Mutex<Option<AutoRefreshTimer>>,
}

impl DashboardService {
    #[must_use]
    pub fn new(client: Arc<dyn DealsApi>, settings_store: SettingsStore, notifier: Arc<dyn Notifier>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            settings_store,
            settings: StdRwLock::new(AllSettings::default()),
            state: Arc::new(RwLock::new(AppState::default())),
            in_flight: AtomicBool::new(false),
            busy: BusyIndicator::new(),
            events,
            notifier,
            auto_refresh: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state_handle(&self) -> Arc<RwLock<AppState>> {
        self.state.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        if self.in_flight.load(Ordering::Acquire) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    #[must_use]
    pub fn settings(&self) -> AllSettings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, event: DashboardEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn publish_notice(&self, notice: Notice) {
        log_notice(&notice);
        self.publish(DashboardEvent::Notice(notice));
    }

    /// Runs one fetch cycle unless one is already running, in which case the
    /// trigger coalesces into it.
    pub async fn trigger_refresh(&self) -> Result<RefreshOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already in flight, coalescing trigger");
            return Ok(RefreshOutcome::Coalesced);
        }
        let _flight = FlightGuard(&self.in_flight);
        let _busy = self.busy.enter();

        match self.run_cycle().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.publish_notice(Notice::for_failure("data", &e));
                Err(e)
            }
        }
    }

    async fn run_cycle(&self) -> Result<RefreshOutcome> {
        let records = self.client.get_deals().await?;
        let fetched_at = Utc::now();
        let fetched = records.len();
        let deals = normalize(records);
        let ui = self.settings().ui_settings;

        let mut state = self.state.write().await;
        let appended = state.history.ingest(&deals);
        let buckets = reduce(&deals, ui.show_only_crosschain)?;
        let found = buckets.total();
        let replaced = state.display.apply(buckets);
        state.rebuild_rows();
        state.last_refresh = fetched_at;
        drop(state);

        info!(fetched, appended, found, replaced = ?replaced, "Refresh cycle completed");

        self.publish(DashboardEvent::DealsUpdated {
            refreshed_at: fetched_at,
            replaced: replaced.clone(),
            found,
        });

        if ui.push_notifications {
            self.notifier
                .notify(PUSH_TITLE, &format!("Found {found} new potential deals"));
        }

        Ok(RefreshOutcome::Completed {
            fetched,
            appended,
            replaced,
        })
    }

    /// Loads settings, falling back to defaults for whatever the backend could
    /// not provide.
    pub async fn load_settings(self: &Arc<Self>) -> AllSettings {
        let loaded = {
            let _busy = self.busy.enter();
            self.settings_store.load().await
        };
        if let Some(e) = &loaded.backend_error {
            self.publish_notice(Notice::for_failure("settings", e));
        }
        self.apply_settings(loaded.settings.clone());
        loaded.settings
    }

    /// Validates form input locally; nothing is saved when any field is invalid.
    pub async fn save_settings(
        self: &Arc<Self>,
        form: &SettingsForm,
    ) -> std::result::Result<SaveReport, Vec<FieldError>> {
        let settings = form.validate()?;
        let report = {
            let _busy = self.busy.enter();
            self.settings_store.save_all(&settings).await
        };

        if report.is_complete() {
            self.publish_notice(Notice::info("Settings saved"));
        } else {
            self.publish_notice(Notice::warning("Some settings could not be saved"));
        }
        self.apply_settings(settings);
        Ok(report)
    }

    /// Replaces the active settings, rescheduling auto-refresh if its
    /// governing values changed.
    pub fn apply_settings(self: &Arc<Self>, settings: AllSettings) {
        let previous = {
            let mut current = self.settings.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, settings)
        };
        let now = self.settings().ui_settings;
        if previous.ui_settings.auto_refresh != now.auto_refresh
            || previous.ui_settings.refresh_interval != now.refresh_interval
        {
            self.reschedule_auto_refresh(&now);
        }
    }

    /// Cancels any pending timer and, if enabled, starts a fresh one.
    pub fn reschedule_auto_refresh(self: &Arc<Self>, ui: &UiSettings) {
        let mut slot = self.auto_refresh.lock().unwrap_or_else(PoisonError::into_inner);
        // Dropping the old timer aborts its task.
        *slot = None;

        if !ui.auto_refresh {
            debug!("Auto-refresh disabled");
            return;
        }

        let interval_secs = ui
            .refresh_interval
            .clamp(MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS);
        let period = Duration::from_secs(interval_secs);
        let service = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                if let Err(e) = service.trigger_refresh().await {
                    debug!(error = %e, "Scheduled refresh failed");
                }
            }
        });

        info!(interval_secs, "Auto-refresh scheduled");
        *slot = Some(AutoRefreshTimer { handle, interval_secs });
    }

    #[must_use]
    pub fn auto_refresh_interval(&self) -> Option<u64> {
        self.auto_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|timer| timer.interval_secs)
    }

    pub fn stop_auto_refresh(&self) {
        self.auto_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state.read().await;
        DashboardSnapshot {
            deals: state.rows.clone(),
            last_refresh: state.last_refresh,
            state: self.refresh_state(),
            busy: self.is_busy(),
        }
    }

    pub async fn rows(&self, category: DealCategory) -> Vec<DealRow> {
        self.state
            .read()
            .await
            .rows
            .get(&category)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn history(&self, key: &GroupingKey) -> OpportunityHistory {
        let state = self.state.read().await;
        OpportunityHistory {
            key: key.clone(),
            deals: state.history.get(key).to_vec(),
            chart: ChartSeries::from_history(&state.history, key),
        }
    }

    pub async fn subscribe_alerts(&self, email: &str, min_profit: Decimal) -> Result<SubscriptionOutcome> {
        let outcome = self.client.subscribe(email, min_profit).await;
        let notice = match &outcome {
            Ok(SubscriptionOutcome::Subscribed) => Notice::info("Subscribed to deal alerts"),
            Ok(SubscriptionOutcome::PendingConfirmation) => {
                Notice::info("Check your inbox to confirm the subscription")
            }
            Ok(SubscriptionOutcome::AlreadySubscribed) => Notice::warning("This email is already subscribed"),
            Ok(SubscriptionOutcome::Rejected(status)) => {
                Notice::error(format!("Subscription failed with status {status}"))
            }
            Err(e) => Notice::for_failure("subscription", e),
        };
        self.publish_notice(notice);
        outcome
    }

    pub async fn unsubscribe_alerts(&self, email: &str) -> Result<u16> {
        let status = self.client.unsubscribe(email).await;
        match &status {
            Ok(code) if (200..300).contains(code) => self.publish_notice(Notice::info("Unsubscribed from deal alerts")),
            Ok(code) => self.publish_notice(Notice::warning(format!("Unsubscribe returned status {code}"))),
            Err(e) => self.publish_notice(Notice::for_failure("subscription", e)),
        }
        status
    }
}

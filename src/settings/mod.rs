/*
 * Dashboard settings: defaults, local cache and backend merge, form validation
 */

mod cache;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::client::DealsApi;
use crate::models::{DashboardError, DbSetting, Result};

pub use cache::{FileCache, LocalCache, MemoryCache};

pub const PUSH_NOTIFICATIONS_KEY: &str = "pushNotifications";
pub const AUTO_REFRESH_KEY: &str = "autoRefresh";
pub const REFRESH_INTERVAL_KEY: &str = "refreshInterval";
pub const SHOW_ONLY_CROSSCHAIN_KEY: &str = "showOnlyCrosschain";

pub const MIN_REFRESH_INTERVAL_SECS: u64 = 1;
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;
pub const MIN_API_SCAN_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSettings {
    pub push_notifications: bool,
    pub auto_refresh: bool,
    pub refresh_interval: u64,
    pub show_only_crosschain: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            push_notifications: false,
            auto_refresh: false,
            refresh_interval: 60,
            show_only_crosschain: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    pub api_scan_interval: u64,
    pub altcoins_min_profit: Decimal,
    pub eth_derivatives_min_profit: Decimal,
    pub stablecoins_min_profit: Decimal,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_scan_interval: 300,
            altcoins_min_profit: Decimal::ONE,
            eth_derivatives_min_profit: Decimal::new(5, 1),
            stablecoins_min_profit: Decimal::new(3, 1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllSettings {
    pub ui_settings: UiSettings,
    pub api_settings: ApiSettings,
}

/// Backend-persisted settings, by their key in the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SettingKey {
    ApiScanInterval,
    AltcoinsMinProfit,
    EthDerivativesMinProfit,
    StablecoinsMinProfit,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::ApiScanInterval,
        SettingKey::AltcoinsMinProfit,
        SettingKey::EthDerivativesMinProfit,
        SettingKey::StablecoinsMinProfit,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ApiScanInterval => "apiScanInterval",
            SettingKey::AltcoinsMinProfit => "altcoinsMinProfit",
            SettingKey::EthDerivativesMinProfit => "ethDerivativesMinProfit",
            SettingKey::StablecoinsMinProfit => "stablecoinsMinProfit",
        }
    }

    #[must_use]
    pub fn value_of(&self, api: &ApiSettings) -> String {
        match self {
            SettingKey::ApiScanInterval => api.api_scan_interval.to_string(),
            SettingKey::AltcoinsMinProfit => api.altcoins_min_profit.to_string(),
            SettingKey::EthDerivativesMinProfit => api.eth_derivatives_min_profit.to_string(),
            SettingKey::StablecoinsMinProfit => api.stablecoins_min_profit.to_string(),
        }
    }
}

fn parse_interval(raw: &str, range: RangeInclusive<u64>) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|v| range.contains(v))
}

fn refresh_interval_range() -> RangeInclusive<u64> {
    MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS
}

fn parse_min_profit(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok().filter(|v| *v > Decimal::ZERO)
}

/// UI settings from the local cache; each key falls back to its default on
/// absence, parse failure or an out-of-range value.
#[must_use]
pub fn ui_settings_from_cache(cache: &dyn LocalCache) -> UiSettings {
    let defaults = UiSettings::default();
    let flag = |key: &str, default: bool| {
        cache
            .get(key)
            .and_then(|raw| serde_json::from_str::<bool>(&raw).ok())
            .unwrap_or(default)
    };

    UiSettings {
        push_notifications: flag(PUSH_NOTIFICATIONS_KEY, defaults.push_notifications),
        auto_refresh: flag(AUTO_REFRESH_KEY, defaults.auto_refresh),
        refresh_interval: cache
            .get(REFRESH_INTERVAL_KEY)
            .and_then(|raw| parse_interval(&raw, refresh_interval_range()))
            .unwrap_or(defaults.refresh_interval),
        show_only_crosschain: flag(SHOW_ONLY_CROSSCHAIN_KEY, defaults.show_only_crosschain),
    }
}

#[must_use]
pub fn ui_settings_to_cache(ui: &UiSettings) -> Vec<(&'static str, String)> {
    vec![
        (PUSH_NOTIFICATIONS_KEY, ui.push_notifications.to_string()),
        (AUTO_REFRESH_KEY, ui.auto_refresh.to_string()),
        (REFRESH_INTERVAL_KEY, ui.refresh_interval.to_string()),
        (SHOW_ONLY_CROSSCHAIN_KEY, ui.show_only_crosschain.to_string()),
    ]
}

/// API settings from the backend's key/value rows; unknown keys are ignored.
#[must_use]
pub fn api_settings_from_rows(rows: &[DbSetting]) -> ApiSettings {
    let defaults = ApiSettings::default();
    let lookup = |key: SettingKey| {
        rows.iter()
            .find(|row| row.key == key.as_str())
            .map(|row| row.value.as_str())
    };

    ApiSettings {
        api_scan_interval: lookup(SettingKey::ApiScanInterval)
            .and_then(|raw| parse_interval(raw, MIN_API_SCAN_INTERVAL_SECS..=u64::MAX))
            .unwrap_or(defaults.api_scan_interval),
        altcoins_min_profit: lookup(SettingKey::AltcoinsMinProfit)
            .and_then(parse_min_profit)
            .unwrap_or(defaults.altcoins_min_profit),
        eth_derivatives_min_profit: lookup(SettingKey::EthDerivativesMinProfit)
            .and_then(parse_min_profit)
            .unwrap_or(defaults.eth_derivatives_min_profit),
        stablecoins_min_profit: lookup(SettingKey::StablecoinsMinProfit)
            .and_then(parse_min_profit)
            .unwrap_or(defaults.stablecoins_min_profit),
    }
}

/// Raw settings-form input, validated locally before anything is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    pub push_notifications: bool,
    pub auto_refresh: bool,
    pub refresh_interval: String,
    pub show_only_crosschain: bool,
    pub api_scan_interval: String,
    pub altcoins_min_profit: String,
    pub eth_derivatives_min_profit: String,
    pub stablecoins_min_profit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl SettingsForm {
    #[must_use]
    pub fn from_settings(settings: &AllSettings) -> Self {
        let ui = &settings.ui_settings;
        let api = &settings.api_settings;
        Self {
            push_notifications: ui.push_notifications,
            auto_refresh: ui.auto_refresh,
            refresh_interval: ui.refresh_interval.to_string(),
            show_only_crosschain: ui.show_only_crosschain,
            api_scan_interval: api.api_scan_interval.to_string(),
            altcoins_min_profit: api.altcoins_min_profit.to_string(),
            eth_derivatives_min_profit: api.eth_derivatives_min_profit.to_string(),
            stablecoins_min_profit: api.stablecoins_min_profit.to_string(),
        }
    }

    /// Collects one error per invalid field rather than stopping at the first.
    pub fn validate(&self) -> std::result::Result<AllSettings, Vec<FieldError>> {
        let mut errors = Vec::new();

        let refresh_interval = parse_interval(&self.refresh_interval, refresh_interval_range());
        if refresh_interval.is_none() {
            errors.push(FieldError {
                field: REFRESH_INTERVAL_KEY,
                message: format!(
                    "must be a whole number of seconds between {MIN_REFRESH_INTERVAL_SECS} and {MAX_REFRESH_INTERVAL_SECS}"
                ),
            });
        }

        let api_scan_interval = parse_interval(&self.api_scan_interval, MIN_API_SCAN_INTERVAL_SECS..=u64::MAX);
        if api_scan_interval.is_none() {
            errors.push(FieldError {
                field: SettingKey::ApiScanInterval.as_str(),
                message: format!("must be a whole number of seconds >= {MIN_API_SCAN_INTERVAL_SECS}"),
            });
        }

        let mut min_profit = |key: SettingKey, raw: &str| {
            let parsed = parse_min_profit(raw);
            if parsed.is_none() {
                errors.push(FieldError {
                    field: key.as_str(),
                    message: "must be a positive number".to_string(),
                });
            }
            parsed
        };
        let altcoins = min_profit(SettingKey::AltcoinsMinProfit, &self.altcoins_min_profit);
        let eth_derivatives = min_profit(SettingKey::EthDerivativesMinProfit, &self.eth_derivatives_min_profit);
        let stablecoins = min_profit(SettingKey::StablecoinsMinProfit, &self.stablecoins_min_profit);

        match (refresh_interval, api_scan_interval, altcoins, eth_derivatives, stablecoins) {
            (Some(refresh_interval), Some(api_scan_interval), Some(altcoins), Some(eth), Some(stable))
                if errors.is_empty() =>
            {
                Ok(AllSettings {
                    ui_settings: UiSettings {
                        push_notifications: self.push_notifications,
                        auto_refresh: self.auto_refresh,
                        refresh_interval,
                        show_only_crosschain: self.show_only_crosschain,
                    },
                    api_settings: ApiSettings {
                        api_scan_interval,
                        altcoins_min_profit: altcoins,
                        eth_derivatives_min_profit: eth,
                        stablecoins_min_profit: stable,
                    },
                })
            }
            _ => Err(errors),
        }
    }
}

/// Result of loading settings; `backend_error` is set when API settings fell
/// back to defaults because the backend could not be read.
#[derive(Debug)]
pub struct SettingsLoad {
    pub settings: AllSettings,
    pub backend_error: Option<DashboardError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub ui_cached: bool,
    pub failed_keys: Vec<SettingKey>,
}

impl SaveReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.ui_cached && self.failed_keys.is_empty()
    }
}

pub struct SettingsStore {
    cache: Arc<dyn LocalCache>,
    client: Arc<dyn DealsApi>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(cache: Arc<dyn LocalCache>, client: Arc<dyn DealsApi>) -> Self {
        Self { cache, client }
    }

    pub async fn load(&self) -> SettingsLoad {
        let ui_settings = ui_settings_from_cache(self.cache.as_ref());

        let (api_settings, backend_error) = match self.client.get_settings().await {
            Ok(rows) => {
                debug!(rows = rows.len(), "Loaded settings from backend");
                (api_settings_from_rows(&rows), None)
            }
            Err(e) => {
                warn!(error = %e, "Unable to fetch settings from backend, using defaults");
                (ApiSettings::default(), Some(e))
            }
        };

        SettingsLoad {
            settings: AllSettings {
                ui_settings,
                api_settings,
            },
            backend_error,
        }
    }

    pub async fn save(&self, key: SettingKey, value: &str) -> bool {
        let ok = self.client.update_setting(key.as_str(), value).await;
        if !ok {
            warn!(key = key.as_str(), "Backend did not persist setting");
        }
        ok
    }

    pub fn save_ui(&self, ui: &UiSettings) -> Result<()> {
        self.cache.set_many(&ui_settings_to_cache(ui))
    }

    /// Mirrors UI settings to the cache in one batch, then writes every API key.
    pub async fn save_all(&self, settings: &AllSettings) -> SaveReport {
        let ui_cached = match self.save_ui(&settings.ui_settings) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to cache UI settings");
                false
            }
        };

        let mut failed_keys = Vec::new();
        for key in SettingKey::ALL {
            let value = key.value_of(&settings.api_settings);
            if !self.save(key, &value).await {
                failed_keys.push(key);
            }
        }

        SaveReport {
            ui_cached,
            failed_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, value: &str) -> DbSetting {
        DbSetting {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn backend_value_overrides_only_its_key() {
        let api = api_settings_from_rows(&[row("altcoinsMinProfit", "2.5")]);
        let defaults = ApiSettings::default();

        assert_eq!(api.altcoins_min_profit, Decimal::from_str("2.5").unwrap());
        assert_eq!(api.api_scan_interval, defaults.api_scan_interval);
        assert_eq!(api.eth_derivatives_min_profit, defaults.eth_derivatives_min_profit);
        assert_eq!(api.stablecoins_min_profit, defaults.stablecoins_min_profit);
    }

    #[test]
    fn unparsable_backend_values_fall_back() {
        let api = api_settings_from_rows(&[
            row("apiScanInterval", "soon"),
            row("ethDerivativesMinProfit", "-1"),
            row("apiScanInterval", "30"),
        ]);
        assert_eq!(api, ApiSettings::default());
    }

    #[test]
    fn empty_cache_yields_ui_defaults() {
        assert_eq!(ui_settings_from_cache(&MemoryCache::new()), UiSettings::default());
    }

    #[test]
    fn cached_ui_values_are_typed_with_fallback() {
        let cache = MemoryCache::new();
        cache
            .set_many(&[
                (AUTO_REFRESH_KEY, "true".to_string()),
                (REFRESH_INTERVAL_KEY, "0".to_string()),
                (PUSH_NOTIFICATIONS_KEY, "yes please".to_string()),
                (SHOW_ONLY_CROSSCHAIN_KEY, "true".to_string()),
            ])
            .unwrap();

        let ui = ui_settings_from_cache(&cache);
        assert!(ui.auto_refresh);
        assert!(ui.show_only_crosschain);
        assert_eq!(ui.refresh_interval, 60);
        assert!(!ui.push_notifications);
    }

    #[test]
    fn ui_settings_round_trip_through_cache_encoding() {
        let ui = UiSettings {
            push_notifications: true,
            auto_refresh: true,
            refresh_interval: 15,
            show_only_crosschain: true,
        };
        let cache = MemoryCache::new();
        cache.set_many(&ui_settings_to_cache(&ui)).unwrap();
        assert_eq!(ui_settings_from_cache(&cache), ui);
    }

    #[test]
    fn form_reports_every_invalid_field() {
        let form = SettingsForm {
            refresh_interval: "0".to_string(),
            api_scan_interval: "59".to_string(),
            altcoins_min_profit: "abc".to_string(),
            eth_derivatives_min_profit: "0".to_string(),
            stablecoins_min_profit: "0.1".to_string(),
            ..SettingsForm::default()
        };

        let errors = form.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["refreshInterval", "apiScanInterval", "altcoinsMinProfit", "ethDerivativesMinProfit"]
        );
    }

    #[test]
    fn refresh_interval_is_capped() {
        let mut form = SettingsForm::from_settings(&AllSettings::default());
        form.refresh_interval = u64::MAX.to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, REFRESH_INTERVAL_KEY);

        form.refresh_interval = MAX_REFRESH_INTERVAL_SECS.to_string();
        assert_eq!(
            form.validate().unwrap().ui_settings.refresh_interval,
            MAX_REFRESH_INTERVAL_SECS
        );

        let cache = MemoryCache::new();
        cache
            .set_many(&[(REFRESH_INTERVAL_KEY, (MAX_REFRESH_INTERVAL_SECS + 1).to_string())])
            .unwrap();
        assert_eq!(ui_settings_from_cache(&cache).refresh_interval, 60);
    }

    #[test]
    fn valid_form_produces_settings() {
        let mut form = SettingsForm::from_settings(&AllSettings::default());
        form.refresh_interval = " 5 ".to_string();
        form.altcoins_min_profit = "1.75".to_string();

        let settings = form.validate().unwrap();
        assert_eq!(settings.ui_settings.refresh_interval, 5);
        assert_eq!(settings.api_settings.altcoins_min_profit, Decimal::from_str("1.75").unwrap());
        assert_eq!(settings.api_settings.api_scan_interval, 300);
    }
}

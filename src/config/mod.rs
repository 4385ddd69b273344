/*
 * Configuration management for the arbview dashboard
 */

use crate::models::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeouts: Timeouts,
}

/// Per-operation request bounds for the backend client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Timeouts {
    pub auth: Duration,
    pub deals: Duration,
    pub settings: Duration,
    pub update_setting: Duration,
    pub subscribe: Duration,
    pub unsubscribe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(5),
            deals: Duration::from_secs(2),
            settings: Duration::from_secs(2),
            update_setting: Duration::from_secs(1),
            subscribe: Duration::from_secs(10),
            unsubscribe: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub settings_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Timeouts::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|e| DashboardError::Config(format!("Invalid port: {e}")))?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            backend: BackendConfig {
                base_url: normalize_base_url(
                    &env::var("ARB_API_URL")
                        .map_err(|_| DashboardError::Config("ARB_API_URL not set".to_string()))?,
                )?,
                timeouts: Timeouts {
                    auth: timeout_from_env("AUTH_TIMEOUT_MS", defaults.auth)?,
                    deals: timeout_from_env("DEALS_TIMEOUT_MS", defaults.deals)?,
                    settings: timeout_from_env("SETTINGS_TIMEOUT_MS", defaults.settings)?,
                    update_setting: timeout_from_env("UPDATE_TIMEOUT_MS", defaults.update_setting)?,
                    subscribe: timeout_from_env("SUBSCRIBE_TIMEOUT_MS", defaults.subscribe)?,
                    unsubscribe: timeout_from_env("UNSUBSCRIBE_TIMEOUT_MS", defaults.unsubscribe)?,
                },
            },
            cache: CacheConfig {
                settings_path: env::var("SETTINGS_CACHE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(".arbview/settings.json")),
            },
        })
    }
}

/// Endpoint paths are appended directly, so the base always ends with a slash.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(DashboardError::Config(format!("Invalid backend URL: {raw}")));
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/"))
    }
}

fn timeout_from_env(var: &str, default: Duration) -> Result<Duration> {
    match env::var(var) {
        Ok(ms) => ms
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| DashboardError::Config(format!("Invalid {var}: {e}"))),
        Err(_) => Ok(default),
    }
}

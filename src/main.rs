/*
 * arbview - Arbitrage Deal Dashboard
 * Main entry point for the application
 */

use arbview::{
    api,
    client::{DealsApi, HttpApiClient},
    config::Config,
    events::LogNotifier,
    service::DashboardService,
    settings::{FileCache, LocalCache, MemoryCache, SettingsStore},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.server.log_level);

    info!("Starting arbview dashboard");
    info!(backend = %config.backend.base_url, "Configuration loaded successfully");

    let client: Arc<dyn DealsApi> = Arc::new(HttpApiClient::new(&config.backend)?);
    if let Err(e) = client.authenticate().await {
        warn!(error = %e, "Backend authentication failed, continuing without session");
    }

    let cache: Arc<dyn LocalCache> = match FileCache::open(&config.cache.settings_path) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(error = %e, "Settings cache unavailable, keeping UI settings in memory");
            Arc::new(MemoryCache::new())
        }
    };
    let settings_store = SettingsStore::new(cache, client.clone());
    let service = Arc::new(DashboardService::new(client, settings_store, Arc::new(LogNotifier)));

    let settings = service.load_settings().await;
    info!(
        auto_refresh = settings.ui_settings.auto_refresh,
        refresh_interval = settings.ui_settings.refresh_interval,
        "Settings loaded"
    );

    if let Err(e) = service.trigger_refresh().await {
        error!(error = %e, "Initial refresh failed");
    }

    let api_state = api::ApiState {
        config: config.clone(),
        service: service.clone(),
    };

    info!("Starting API server on {}:{}", config.server.host, config.server.port);

    let rocket = api::create_rocket(api_state);
    rocket
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {e}"))?;

    service.stop_auto_refresh();
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("arbview={log_level}").into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

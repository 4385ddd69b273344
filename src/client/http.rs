/*
 * reqwest-backed implementation of the backend API client
 */

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use crate::client::DealsApi;
use crate::config::{BackendConfig, Timeouts};
use crate::models::{DashboardError, DbSetting, DealRecord, Result, SubscriptionOutcome};

const AUTH_ENDPOINT: &str = "auth";
const GET_DEALS_ENDPOINT: &str = "get-deals";
const GET_SETTINGS_ENDPOINT: &str = "get-settings";
const UPDATE_SETTING_ENDPOINT: &str = "update-setting";
const SUBSCRIBE_ENDPOINT: &str = "subscribe-notification";
const UNSUBSCRIBE_ENDPOINT: &str = "unsubscribe-notification";

pub struct HttpApiClient {
    client: Client,
    base_url: String,
    timeouts: Timeouts,
}

#[derive(Serialize)]
struct UpdateSettingBody<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct SubscribeBody<'a> {
    email: &'a str,
    min_profit: f64,
}

#[derive(Serialize)]
struct UnsubscribeBody<'a> {
    email: &'a str,
}

impl HttpApiClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeouts: config.timeouts,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<Response> {
        request
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(classify_error)
    }
}

/// Timeouts and unreachable hosts become [`DashboardError::Connection`] so the
/// caller can show a connectivity warning instead of a generic failure.
fn classify_error(err: reqwest::Error) -> DashboardError {
    if err.is_timeout() || err.is_connect() {
        DashboardError::Connection(err.to_string())
    } else {
        DashboardError::Network(err)
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DashboardError::Request {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}

#[async_trait]
impl DealsApi for HttpApiClient {
    async fn authenticate(&self) -> Result<()> {
        let response = self
            .send(self.client.get(self.url(AUTH_ENDPOINT)), self.timeouts.auth)
            .await?;
        ensure_success(response)?;
        debug!("Authenticated against backend");
        Ok(())
    }

    async fn get_deals(&self) -> Result<Vec<DealRecord>> {
        let response = self
            .send(self.client.get(self.url(GET_DEALS_ENDPOINT)), self.timeouts.deals)
            .await?;
        let deals = ensure_success(response)?
            .json::<Vec<DealRecord>>()
            .await
            .map_err(classify_error)?;
        debug!(count = deals.len(), "Fetched deals");
        Ok(deals)
    }

    async fn get_settings(&self) -> Result<Vec<DbSetting>> {
        let response = self
            .send(self.client.get(self.url(GET_SETTINGS_ENDPOINT)), self.timeouts.settings)
            .await?;
        let settings = ensure_success(response)?
            .json::<Vec<DbSetting>>()
            .await
            .map_err(classify_error)?;
        Ok(settings)
    }

    async fn update_setting(&self, key: &str, value: &str) -> bool {
        let request = self
            .client
            .post(self.url(UPDATE_SETTING_ENDPOINT))
            .json(&UpdateSettingBody { key, value });

        match self.send(request, self.timeouts.update_setting).await {
            Ok(response) => response.status() == StatusCode::CREATED,
            Err(e) => {
                warn!(key, error = %e, "Failed to update setting");
                false
            }
        }
    }

    async fn subscribe(&self, email: &str, min_profit: Decimal) -> Result<SubscriptionOutcome> {
        let request = self
            .client
            .post(self.url(SUBSCRIBE_ENDPOINT))
            .json(&SubscribeBody {
                email,
                min_profit: min_profit.to_f64().unwrap_or_default(),
            });
        let response = self.send(request, self.timeouts.subscribe).await?;
        Ok(SubscriptionOutcome::from_status(response.status().as_u16()))
    }

    async fn unsubscribe(&self, email: &str) -> Result<u16> {
        let request = self
            .client
            .post(self.url(UNSUBSCRIBE_ENDPOINT))
            .json(&UnsubscribeBody { email });
        let response = self.send(request, self.timeouts.unsubscribe).await?;
        Ok(response.status().as_u16())
    }
}

/*
 * Backend API client module for the arbitrage detection service
 */

mod http;

use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::models::{DbSetting, DealRecord, Result, SubscriptionOutcome};

pub use http::HttpApiClient;

/// Operations the dashboard needs from the detection backend.
///
/// `update_setting` reports persistence failure through its return value and
/// never errors; callers must check the flag.
#[async_trait]
pub trait DealsApi: Send + Sync {
    async fn authenticate(&self) -> Result<()>;
    async fn get_deals(&self) -> Result<Vec<DealRecord>>;
    async fn get_settings(&self) -> Result<Vec<DbSetting>>;
    async fn update_setting(&self, key: &str, value: &str) -> bool;
    async fn subscribe(&self, email: &str, min_profit: Decimal) -> Result<SubscriptionOutcome>;
    async fn unsubscribe(&self, email: &str) -> Result<u16>;
}

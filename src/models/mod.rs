/*
 * Data models and types for the arbitrage dashboard
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One deal as returned by the detection backend's `/get-deals` endpoint.
///
/// The category tag stays a raw string here; it is only interpreted by the
/// reducer, which rejects tags outside [`DealCategory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    pub deal_id: String,
    #[serde(alias = "buy_chain")]
    pub source_chain: String,
    #[serde(alias = "buy_dex")]
    pub source_dex: String,
    #[serde(alias = "sell_chain")]
    pub dest_chain: String,
    #[serde(alias = "sell_dex")]
    pub dest_dex: String,
    pub pair: String,
    #[serde(alias = "pair_address")]
    pub source_pair_address: String,
    #[serde(default)]
    pub dest_pair_address: String,
    #[serde(default)]
    pub source_buy_token_address: String,
    #[serde(default)]
    pub source_sell_token_address: String,
    #[serde(default)]
    pub dest_buy_token_address: String,
    #[serde(default)]
    pub dest_sell_token_address: String,
    pub profit: Decimal,
    pub date: DateTime<Utc>,
    #[serde(rename = "source")]
    pub category: String,
}

impl DealRecord {
    #[must_use]
    pub fn is_crosschain(&self) -> bool {
        self.source_chain != self.dest_chain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealCategory {
    Altcoins,
    EthDerivatives,
    Stablecoins,
}

impl DealCategory {
    pub const ALL: [DealCategory; 3] = [
        DealCategory::Altcoins,
        DealCategory::EthDerivatives,
        DealCategory::Stablecoins,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DealCategory::Altcoins => "altcoins",
            DealCategory::EthDerivatives => "eth_derivatives",
            DealCategory::Stablecoins => "stablecoins",
        }
    }
}

impl fmt::Display for DealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DealCategory {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "altcoins" => Ok(DealCategory::Altcoins),
            "eth_derivatives" => Ok(DealCategory::EthDerivatives),
            "stablecoins" => Ok(DealCategory::Stablecoins),
            _ => Err(DashboardError::Taxonomy(s.to_string())),
        }
    }
}

/// Identity of an opportunity across refresh cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingKey {
    pub source_pair_address: String,
    pub dest_pair_address: String,
}

impl GroupingKey {
    #[must_use]
    pub fn new(source_pair_address: impl Into<String>, dest_pair_address: impl Into<String>) -> Self {
        Self {
            source_pair_address: source_pair_address.into(),
            dest_pair_address: dest_pair_address.into(),
        }
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.source_pair_address, self.dest_pair_address)
    }
}

/// A [`DealRecord`] enriched with its grouping key and split token labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(flatten)]
    pub record: DealRecord,
    pub key: GroupingKey,
    pub buy_token: String,
    pub sell_token: String,
}

/// Key/value pair as stored by the backend's settings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbSetting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionOutcome {
    Subscribed,
    PendingConfirmation,
    AlreadySubscribed,
    Rejected(u16),
}

impl SubscriptionOutcome {
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => SubscriptionOutcome::Subscribed,
            202 => SubscriptionOutcome::PendingConfirmation,
            409 => SubscriptionOutcome::AlreadySubscribed,
            other => SubscriptionOutcome::Rejected(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {status} {status_text}")]
    Request { status: u16, status_text: String },

    #[error("Unhandled deal source: {0}")]
    Taxonomy(String),

    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings cache error: {0}")]
    Cache(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, DashboardError::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn deserializes_legacy_field_names() {
        let raw = r#"{
            "deal_id": "d-1",
            "buy_chain": "arbitrum",
            "buy_dex": "uniswap",
            "sell_chain": "base",
            "sell_dex": "aerodrome",
            "pair": "WETH:USDC",
            "pair_address": "0xaaa",
            "profit": 1.25,
            "date": "2024-05-01T12:00:00Z",
            "source": "altcoins"
        }"#;

        let record: DealRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.source_chain, "arbitrum");
        assert_eq!(record.dest_dex, "aerodrome");
        assert_eq!(record.source_pair_address, "0xaaa");
        assert_eq!(record.dest_pair_address, "");
        assert_eq!(record.profit, Decimal::from_str("1.25").unwrap());
        assert_eq!(record.category, "altcoins");
        assert!(record.is_crosschain());
    }

    #[test]
    fn unknown_category_is_a_taxonomy_error() {
        let err = DealCategory::from_str("unknown_source").unwrap_err();
        assert!(matches!(err, DashboardError::Taxonomy(tag) if tag == "unknown_source"));
        assert_eq!(DealCategory::from_str("eth_derivatives").unwrap(), DealCategory::EthDerivatives);
    }

    #[test]
    fn subscription_status_mapping() {
        assert_eq!(SubscriptionOutcome::from_status(200), SubscriptionOutcome::Subscribed);
        assert_eq!(SubscriptionOutcome::from_status(202), SubscriptionOutcome::PendingConfirmation);
        assert_eq!(SubscriptionOutcome::from_status(409), SubscriptionOutcome::AlreadySubscribed);
        assert_eq!(SubscriptionOutcome::from_status(500), SubscriptionOutcome::Rejected(500));
    }

    #[test]
    fn grouping_key_displays_as_concatenation() {
        let key = GroupingKey::new("0xabc", "0xdef");
        assert_eq!(key.to_string(), "0xabc0xdef");
    }
}

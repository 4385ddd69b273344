/*
 * Deal ingestion pipeline: normalization, historization, reduction and row views
 */

pub mod history;
pub mod normalizer;
pub mod reducer;
pub mod view;

pub use history::HistoryStore;
pub use normalizer::normalize;
pub use reducer::{reduce, CategoryBuckets, DisplayBuckets};
pub use view::{build_rows, BridgeLaunch, ChartSeries, DealRow, ProfitTrend};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use crate::models::DealRecord;

    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap()
    }

    pub fn record(id: &str, pair_addresses: (&str, &str), secs: i64, profit: i64, category: &str) -> DealRecord {
        DealRecord {
            deal_id: id.to_string(),
            source_chain: "arbitrum".to_string(),
            source_dex: "uniswap".to_string(),
            dest_chain: "base".to_string(),
            dest_dex: "aerodrome".to_string(),
            pair: "WETH:USDC".to_string(),
            source_pair_address: pair_addresses.0.to_string(),
            dest_pair_address: pair_addresses.1.to_string(),
            source_buy_token_address: "0x01".to_string(),
            source_sell_token_address: "0x02".to_string(),
            dest_buy_token_address: "0x03".to_string(),
            dest_sell_token_address: "0x04".to_string(),
            profit: Decimal::from(profit),
            date: at(secs),
            category: category.to_string(),
        }
    }
}

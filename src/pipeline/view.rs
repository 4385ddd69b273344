/*
 * Per-row view models and profit chart series built from the history store
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::models::{Deal, DealCategory, GroupingKey};
use crate::pipeline::HistoryStore;
use crate::utils::{chain_id, dex_short_name, dex_site, format_address, format_profit};

const HOT_PROFIT_PERCENT: i64 = 10;

/// Direction of the current profit relative to the first observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfitTrend {
    Up,
    Down,
    Flat,
}

/// Launch parameters for the bridging widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeLaunch {
    pub source_chain_id: u64,
    pub dest_chain_id: u64,
    pub source_token: String,
    pub dest_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealRow {
    pub key: GroupingKey,
    pub category: DealCategory,
    pub deal_id: String,
    pub pair: String,
    pub buy_token: String,
    pub sell_token: String,
    pub source_chain: String,
    pub source_dex: String,
    pub source_dex_label: String,
    pub source_dex_url: Option<String>,
    pub dest_chain: String,
    pub dest_dex: String,
    pub dest_dex_label: String,
    pub dest_dex_url: Option<String>,
    pub profit: Decimal,
    pub profit_display: String,
    pub date: DateTime<Utc>,
    pub history_count: usize,
    pub average_profit: Decimal,
    pub trend: Option<ProfitTrend>,
    pub duplicate_timestamps: bool,
    pub hot: bool,
    pub bridge: Option<BridgeLaunch>,
}

impl DealRow {
    #[must_use]
    pub fn build(category: DealCategory, deal: &Deal, history: &HistoryStore) -> Self {
        let record = &deal.record;
        let observations = history.get(&deal.key);

        let trend = if observations.len() > 1 {
            observations.first().map(|first| trend_between(first.record.profit, record.profit))
        } else {
            None
        };

        Self {
            key: deal.key.clone(),
            category,
            deal_id: record.deal_id.clone(),
            pair: record.pair.clone(),
            buy_token: deal.buy_token.clone(),
            sell_token: deal.sell_token.clone(),
            source_chain: record.source_chain.clone(),
            source_dex: record.source_dex.clone(),
            source_dex_label: dex_short_name(&record.source_dex).to_string(),
            source_dex_url: dex_site(&record.source_dex).map(str::to_string),
            dest_chain: record.dest_chain.clone(),
            dest_dex: record.dest_dex.clone(),
            dest_dex_label: dex_short_name(&record.dest_dex).to_string(),
            dest_dex_url: dex_site(&record.dest_dex).map(str::to_string),
            profit: record.profit,
            profit_display: format_profit(record.profit),
            date: record.date,
            history_count: observations.len(),
            average_profit: history.average_profit(&deal.key).unwrap_or(record.profit),
            trend,
            duplicate_timestamps: history.has_duplicate_timestamps(&deal.key),
            hot: record.profit > Decimal::from(HOT_PROFIT_PERCENT),
            bridge: bridge_launch(deal),
        }
    }
}

fn trend_between(first: Decimal, current: Decimal) -> ProfitTrend {
    match current.cmp(&first) {
        std::cmp::Ordering::Greater => ProfitTrend::Up,
        std::cmp::Ordering::Less => ProfitTrend::Down,
        std::cmp::Ordering::Equal => ProfitTrend::Flat,
    }
}

/// Only cross-chain deals between two bridge-supported chains can be bridged.
fn bridge_launch(deal: &Deal) -> Option<BridgeLaunch> {
    let record = &deal.record;
    if !record.is_crosschain() {
        return None;
    }
    Some(BridgeLaunch {
        source_chain_id: chain_id(&record.source_chain)?,
        dest_chain_id: chain_id(&record.dest_chain)?,
        source_token: format_address(&record.source_buy_token_address).ok()?,
        dest_token: format_address(&record.dest_sell_token_address).ok()?,
    })
}

#[must_use]
pub fn build_rows(category: DealCategory, deals: &[Deal], history: &HistoryStore) -> Vec<DealRow> {
    deals
        .iter()
        .map(|deal| DealRow::build(category, deal, history))
        .collect()
}

/// Bar-chart data for one opportunity: one label per distinct observation time,
/// `series[i][j]` being the i-th profit seen at label `j` (zero when absent).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub series: Vec<Vec<Decimal>>,
}

impl ChartSeries {
    #[must_use]
    pub fn from_history(history: &HistoryStore, key: &GroupingKey) -> Self {
        let mut labels: Vec<String> = Vec::new();
        let mut profits_by_label: Vec<Vec<Decimal>> = Vec::new();

        for deal in history.get(key) {
            let label = deal.record.date.format("%Y-%m-%d %H:%M:%S").to_string();
            let profit = deal.record.profit.round_dp(2);
            match labels.iter().position(|l| *l == label) {
                Some(idx) => profits_by_label[idx].push(profit),
                None => {
                    labels.push(label);
                    profits_by_label.push(vec![profit]);
                }
            }
        }

        let width = profits_by_label.iter().map(Vec::len).max().unwrap_or(0);
        let series = (0..width)
            .map(|i| {
                profits_by_label
                    .iter()
                    .map(|profits| profits.get(i).copied().unwrap_or(Decimal::ZERO))
                    .collect()
            })
            .collect();

        Self { labels, series }
    }
}

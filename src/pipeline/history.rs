/*
 * Append-only per-opportunity history with deal-id deduplication
 */

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use crate::models::{Deal, GroupingKey};

/// Session-lifetime store of every distinct deal observed, grouped by key.
///
/// Entries are never removed. A deal id is appended at most once no matter how
/// many refresh cycles re-deliver it.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: HashMap<GroupingKey, Vec<Deal>>,
    seen_ids: HashSet<String>,
}

impl HistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many deals were appended.
    pub fn ingest(&mut self, deals: &[Deal]) -> usize {
        let mut appended = 0;
        for deal in deals {
            if !self.seen_ids.insert(deal.record.deal_id.clone()) {
                continue;
            }
            self.entries
                .entry(deal.key.clone())
                .or_default()
                .push(deal.clone());
            appended += 1;
        }
        appended
    }

    #[must_use]
    pub fn get(&self, key: &GroupingKey) -> &[Deal] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn first(&self, key: &GroupingKey) -> Option<&Deal> {
        self.get(key).first()
    }

    #[must_use]
    pub fn count(&self, key: &GroupingKey) -> usize {
        self.get(key).len()
    }

    #[must_use]
    pub fn has_seen(&self, deal_id: &str) -> bool {
        self.seen_ids.contains(deal_id)
    }

    /// Number of distinct opportunities tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn average_profit(&self, key: &GroupingKey) -> Option<Decimal> {
        let history = self.get(key);
        if history.is_empty() {
            return None;
        }
        let total: Decimal = history.iter().map(|d| d.record.profit).sum();
        Some(total / Decimal::from(history.len()))
    }

    /// True when some observations of this opportunity share a timestamp.
    #[must_use]
    pub fn has_duplicate_timestamps(&self, key: &GroupingKey) -> bool {
        let history = self.get(key);
        let distinct: HashSet<_> = history.iter().map(|d| d.record.date).collect();
        distinct.len() < history.len()
    }
}

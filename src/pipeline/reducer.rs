/*
 * Latest-deal reducer and sticky per-category display buckets
 */

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use crate::models::{Deal, DealCategory, GroupingKey, Result};

/// Output of one reduction pass: the latest deal per opportunity, by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBuckets {
    buckets: BTreeMap<DealCategory, Vec<Deal>>,
}

impl CategoryBuckets {
    #[must_use]
    pub fn get(&self, category: DealCategory) -> &[Deal] {
        self.buckets.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    fn push(&mut self, category: DealCategory, deal: Deal) {
        self.buckets.entry(category).or_default().push(deal);
    }
}

/// Collapses the current fetch to one deal per grouping key and partitions it.
///
/// Every record's category tag is validated first, so an unknown tag fails the
/// whole pass before anything is produced.
pub fn reduce(deals: &[Deal], crosschain_only: bool) -> Result<CategoryBuckets> {
    let categorized = deals
        .iter()
        .map(|deal| DealCategory::from_str(&deal.record.category).map(|c| (c, deal)))
        .collect::<Result<Vec<_>>>()?;

    let mut index: HashMap<&GroupingKey, usize> = HashMap::new();
    let mut latest: Vec<(DealCategory, &Deal)> = Vec::new();

    for (category, deal) in categorized {
        if crosschain_only && !deal.record.is_crosschain() {
            continue;
        }
        match index.get(&deal.key) {
            Some(&slot) => {
                if deal.record.date >= latest[slot].1.record.date {
                    latest[slot] = (category, deal);
                }
            }
            None => {
                index.insert(&deal.key, latest.len());
                latest.push((category, deal));
            }
        }
    }

    let mut buckets = CategoryBuckets::default();
    for (category, deal) in latest {
        buckets.push(category, deal.clone());
    }
    Ok(buckets)
}

/// Deals currently shown per category.
///
/// A category is only replaced when a pass produced at least one deal for it;
/// an empty pass leaves the previous contents on display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayBuckets {
    shown: BTreeMap<DealCategory, Vec<Deal>>,
}

impl DisplayBuckets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the categories whose contents were replaced.
    pub fn apply(&mut self, update: CategoryBuckets) -> Vec<DealCategory> {
        let mut replaced = Vec::new();
        for (category, deals) in update.buckets {
            if deals.is_empty() {
                continue;
            }
            self.shown.insert(category, deals);
            replaced.push(category);
        }
        replaced
    }

    #[must_use]
    pub fn get(&self, category: DealCategory) -> &[Deal] {
        self.shown.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DealCategory, &[Deal])> {
        DealCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DashboardError;
    use crate::pipeline::fixtures::record;
    use crate::pipeline::normalize;
    use rust_decimal::Decimal;

    #[test]
    fn picks_max_timestamp_per_group() {
        let deals = normalize(vec![
            record("t1", ("0x1", "0x2"), 1, 5, "altcoins"),
            record("t3", ("0x1", "0x2"), 3, 2, "altcoins"),
            record("t2", ("0x1", "0x2"), 2, 9, "altcoins"),
        ]);

        let buckets = reduce(&deals, false).unwrap();
        let altcoins = buckets.get(DealCategory::Altcoins);
        assert_eq!(altcoins.len(), 1);
        assert_eq!(altcoins[0].record.deal_id, "t3");
        assert_eq!(altcoins[0].record.profit, Decimal::from(2));
    }

    #[test]
    fn groups_only_on_equal_pair_addresses() {
        let deals = normalize(vec![
            record("a", ("0x1", "0x2"), 1, 1, "altcoins"),
            record("b", ("0x1", "0x3"), 1, 1, "altcoins"),
            record("c", ("0x2", "0x1"), 1, 1, "altcoins"),
            record("d", ("0x1", "0x2"), 2, 1, "altcoins"),
        ]);

        let buckets = reduce(&deals, false).unwrap();
        let ids: Vec<_> = buckets
            .get(DealCategory::Altcoins)
            .iter()
            .map(|d| d.record.deal_id.as_str())
            .collect();
        assert_eq!(ids, vec!["d", "b", "c"]);
    }

    #[test]
    fn partitions_by_category() {
        let deals = normalize(vec![
            record("a", ("0x1", "0x2"), 1, 1, "altcoins"),
            record("b", ("0x3", "0x4"), 1, 1, "eth_derivatives"),
            record("c", ("0x5", "0x6"), 1, 1, "stablecoins"),
            record("d", ("0x7", "0x8"), 1, 1, "stablecoins"),
        ]);

        let buckets = reduce(&deals, false).unwrap();
        assert_eq!(buckets.get(DealCategory::Altcoins).len(), 1);
        assert_eq!(buckets.get(DealCategory::EthDerivatives).len(), 1);
        assert_eq!(buckets.get(DealCategory::Stablecoins).len(), 2);
        assert_eq!(buckets.total(), 4);
    }

    #[test]
    fn unknown_category_fails_the_pass() {
        let deals = normalize(vec![
            record("a", ("0x1", "0x2"), 1, 1, "altcoins"),
            record("b", ("0x3", "0x4"), 1, 1, "unknown_source"),
        ]);

        let err = reduce(&deals, false).unwrap_err();
        assert!(matches!(err, DashboardError::Taxonomy(tag) if tag == "unknown_source"));
    }

    #[test]
    fn crosschain_filter_drops_same_chain_deals() {
        let mut same_chain = record("same", ("0x1", "0x2"), 5, 1, "altcoins");
        same_chain.dest_chain = same_chain.source_chain.clone();
        let deals = normalize(vec![same_chain, record("cross", ("0x3", "0x4"), 1, 1, "altcoins")]);

        let filtered = reduce(&deals, true).unwrap();
        let ids: Vec<_> = filtered
            .get(DealCategory::Altcoins)
            .iter()
            .map(|d| d.record.deal_id.as_str())
            .collect();
        assert_eq!(ids, vec!["cross"]);

        assert_eq!(reduce(&deals, false).unwrap().total(), 2);
    }

    #[test]
    fn crosschain_filter_applies_before_grouping() {
        let mut newer_same_chain = record("newer", ("0x1", "0x2"), 9, 1, "altcoins");
        newer_same_chain.dest_chain = newer_same_chain.source_chain.clone();
        let deals = normalize(vec![record("older", ("0x1", "0x2"), 1, 1, "altcoins"), newer_same_chain]);

        let buckets = reduce(&deals, true).unwrap();
        assert_eq!(buckets.get(DealCategory::Altcoins)[0].record.deal_id, "older");
    }

    #[test]
    fn empty_category_keeps_previous_display() {
        let mut display = DisplayBuckets::new();
        let first = normalize(vec![
            record("s1", ("0x1", "0x2"), 1, 1, "stablecoins"),
            record("s2", ("0x3", "0x4"), 1, 1, "stablecoins"),
            record("s3", ("0x5", "0x6"), 1, 1, "stablecoins"),
            record("a1", ("0x7", "0x8"), 1, 1, "altcoins"),
        ]);
        display.apply(reduce(&first, false).unwrap());

        let second = normalize(vec![record("a2", ("0x9", "0xa"), 2, 1, "altcoins")]);
        let replaced = display.apply(reduce(&second, false).unwrap());

        assert_eq!(replaced, vec![DealCategory::Altcoins]);
        assert_eq!(display.get(DealCategory::Stablecoins).len(), 3);
        assert_eq!(display.get(DealCategory::Altcoins)[0].record.deal_id, "a2");
    }
}

/*
 * Maps raw wire records into enriched deals with a grouping key
 */

use crate::models::{Deal, DealRecord, GroupingKey};

/// Order-preserving and total: every input record yields exactly one deal.
#[must_use]
pub fn normalize(records: Vec<DealRecord>) -> Vec<Deal> {
    records.into_iter().map(normalize_one).collect()
}

#[must_use]
pub fn normalize_one(record: DealRecord) -> Deal {
    let key = GroupingKey::new(
        record.source_pair_address.clone(),
        record.dest_pair_address.clone(),
    );
    let (buy_token, sell_token) = split_pair(&record.pair);

    Deal {
        record,
        key,
        buy_token,
        sell_token,
    }
}

fn split_pair(pair: &str) -> (String, String) {
    let mut parts = pair.splitn(2, ':');
    let buy = parts.next().unwrap_or_default().to_string();
    let sell = parts.next().unwrap_or_default().to_string();
    (buy, sell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fixtures::record;

    #[test]
    fn preserves_order_and_length() {
        let input = vec![
            record("c", ("0x1", "0x2"), 3, 1, "altcoins"),
            record("a", ("0x1", "0x2"), 1, 1, "altcoins"),
            record("b", ("0x3", "0x4"), 2, 1, "stablecoins"),
        ];

        let deals = normalize(input);
        let ids: Vec<_> = deals.iter().map(|d| d.record.deal_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn derives_key_from_both_pair_addresses() {
        let deal = normalize_one(record("a", ("0xabc", "0xdef"), 0, 1, "altcoins"));
        assert_eq!(deal.key, GroupingKey::new("0xabc", "0xdef"));
        assert_eq!(deal.key.to_string(), "0xabc0xdef");
    }

    #[test]
    fn splits_token_labels() {
        let deal = normalize_one(record("a", ("0x1", "0x2"), 0, 1, "altcoins"));
        assert_eq!(deal.buy_token, "WETH");
        assert_eq!(deal.sell_token, "USDC");

        let mut lone = record("b", ("0x1", "0x2"), 0, 1, "altcoins");
        lone.pair = "WETH".to_string();
        let deal = normalize_one(lone);
        assert_eq!(deal.buy_token, "WETH");
        assert_eq!(deal.sell_token, "");
    }
}

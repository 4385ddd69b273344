/*
 * Venue directory and formatting helpers
 */

use rust_decimal::Decimal;
use crate::models::{DashboardError, Result};

/// EVM chain id for a backend chain name, if the bridge widget supports it.
#[must_use]
pub fn chain_id(chain: &str) -> Option<u64> {
    match chain.to_lowercase().as_str() {
        "ethereum" => Some(1),
        "optimism" => Some(10),
        "bnb" | "bsc" => Some(56),
        "polygon" => Some(137),
        "mantle" => Some(5000),
        "base" => Some(8453),
        "arbitrum" => Some(42161),
        "avalanche" => Some(43114),
        "linea" => Some(59144),
        _ => None,
    }
}

/// Ticker-style abbreviation shown next to a DEX; unknown venues keep their name.
#[must_use]
pub fn dex_short_name(dex: &str) -> &str {
    match dex {
        "uniswap" => "uni",
        "aerodrome" => "aero",
        "syncswap" => "sync",
        "pancakeswap" => "cake",
        "sushiswap" => "sushi",
        "balancer" => "bal",
        "ramses" => "ram",
        "fenix" => "phb",
        "stargate" => "stg",
        "camelot" => "grail",
        "velodrome" => "velo",
        "fusion" => "fsn",
        "thena" => "the",
        "fraxswap" => "fxs",
        other => other,
    }
}

#[must_use]
pub fn dex_site(dex: &str) -> Option<&'static str> {
    let site = match dex {
        "uniswap" => "https://app.uniswap.org/swap",
        "aerodrome" => "https://aerodrome.finance/swap",
        "syncswap" => "https://syncswap.xyz/",
        "pancakeswap" => "https://pancakeswap.finance/",
        "sushiswap" => "https://www.sushi.com/swap",
        "balancer" => "https://balancer.fi/swap/",
        "ramses" => "https://www.ramses.exchange/swap",
        "fenix" => "https://www.fenixfinance.io/trade/swap",
        "camelot" => "https://app.camelot.exchange/",
        "velodrome" => "https://velodrome.finance/swap",
        "iziswap" => "https://izumi.finance/trade/swap",
        "fusionx" => "https://fusionx.finance/swap",
        "kim" => "https://app.kim.exchange/swap",
        "lynex" => "https://app.lynex.fi/swap",
        "nile" => "https://www.nile.build/swap",
        "agni" => "https://agni.finance/swap",
        "cleo" => "https://cleo.exchange/swap",
        "methlab" => "https://www.methlab.xyz/swap",
        "merchantmoe" => "https://merchantmoe.com/trade",
        "fraxswap" => "https://app.frax.finance/swap/main",
        "thena" => "https://thena.fi/",
        _ => return None,
    };
    Some(site)
}

/// Profit percentage with two decimals, e.g. `2.35%`.
#[must_use]
pub fn format_profit(profit: Decimal) -> String {
    format!("{:.2}%", profit.round_dp(2))
}

pub fn format_address(address: &str) -> Result<String> {
    if !address.starts_with("0x") || address.len() != 42 {
        return Err(DashboardError::Validation {
            field: "address".to_string(),
            message: format!("Invalid address format: {address}"),
        });
    }
    Ok(address.to_lowercase())
}

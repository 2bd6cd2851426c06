use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LastTradeDirection, MarketId, OhlcDuration};

/// Full order book snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub market_id: MarketId,
    pub buy: Vec<BookEntry>,
    pub sell: Vec<BookEntry>,
    pub last: LastTrade,
}

/// Incremental order book change; levels with zero size are removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookDiff {
    pub sequence_number: u64,
    pub market_id: MarketId,
    pub buy: Vec<BookEntry>,
    pub sell: Vec<BookEntry>,
    pub last: Option<LastTrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    pub price: String,
    pub size: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastTrade {
    pub price: String,
    pub direction: LastTradeDirection,
}

/// Candles for one market
///
/// `full` distinguishes a complete history from an update of the latest
/// candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prices {
    pub market: MarketId,
    pub duration: OhlcDuration,
    pub ohlc: Vec<Ohlc>,
    pub full: bool,
    pub daily_change: Decimal,
    pub daily_market_cap_change: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ohlc {
    pub start: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub duration: OhlcDuration,
    #[serde(default)]
    pub open_market_cap: Option<Decimal>,
    #[serde(default)]
    pub high_market_cap: Option<Decimal>,
    #[serde(default)]
    pub low_market_cap: Option<Decimal>,
    #[serde(default)]
    pub close_market_cap: Option<Decimal>,
}

/// Per-market limit consumption, sent as `[base, quote, baseLeft, quoteLeft]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConsumption {
    pub base_amount: i64,
    pub quote_amount: i64,
    pub base_amount_left: i64,
    pub quote_amount_left: i64,
}

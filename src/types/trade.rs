use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ClientOrderId, ExecutionRole, MarketId, OrderId, OrderSide, SettlementStatus, Symbol, TradeId};

/// One of the caller's own trades, as published on the `MyTrades` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: TradeId,
    pub timestamp: DateTime<Utc>,
    pub order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub market_id: MarketId,
    pub execution_role: ExecutionRole,
    pub counter_order_id: OrderId,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub fee_amount: Decimal,
    pub fee_symbol: Symbol,
    pub settlement_status: SettlementStatus,
    #[serde(default)]
    pub error: Option<String>,
}

/// A public trade on the `MarketTrades` topic
///
/// Sent compactly as a positional array:
/// `[id, side, amount, price, notional, timestampMs, takerNickname, takerId]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrade {
    pub id: TradeId,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub notional: Decimal,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub taker_nickname: String,
    pub taker_id: Decimal,
}

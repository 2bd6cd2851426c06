use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ClientOrderId, ExecutionRole, MarketId, OrderId, OrderSide, OrderStatus, Symbol, TradeId};

/// An order as published on the `MyOrders` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub client_order_id: ClientOrderId,
    pub status: OrderStatus,
    pub market_id: MarketId,
    pub side: OrderSide,
    pub amount: Decimal,
    pub executions: Vec<Execution>,
    pub timing: Timing,
    #[serde(flatten)]
    pub kind: OrderKind,
}

/// Order-type specific fields, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OrderKind {
    Market,
    BackToBackMarket {
        second_market_id: MarketId,
    },
    Limit {
        original_amount: Decimal,
        auto_reduced: bool,
        price: Decimal,
    },
}

/// A fill against an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub trade_id: TradeId,
    pub timestamp: DateTime<Utc>,
    pub amount: Decimal,
    pub price: Decimal,
    pub role: ExecutionRole,
    pub fee_amount: Decimal,
    pub fee_symbol: Symbol,
    pub market_id: MarketId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub sequencer_time_ns: Decimal,
}

use crate::types::{
    AckAction, Balance, MarketConsumption, MarketTrade, MarketId, Order, OrderBook, OrderBookDiff,
    Prices, Topic, Trade, UpdatedBalance,
};

/// One decoded unit of server output
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Reply to a client heartbeat
    Heartbeat,
    /// Acknowledgment of a subscribe or unsubscribe request
    Ack {
        topic: Topic,
        action: AckAction,
        success: bool,
        reason: Option<String>,
    },
    /// Data published on a subscribed topic
    Publish { topic: Topic, payload: Publication },
}

impl Envelope {
    /// Topic this envelope belongs to, if any
    pub fn topic(&self) -> Option<&Topic> {
        match self {
            Envelope::Heartbeat => None,
            Envelope::Ack { topic, .. } | Envelope::Publish { topic, .. } => Some(topic),
        }
    }

    pub fn payload(&self) -> Option<&Publication> {
        match self {
            Envelope::Publish { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

/// Publication payload, one variant per topic kind
///
/// Each inner enum separates full snapshots from incremental updates, so
/// handling code is forced to deal with both.
#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    OrderBook(OrderBook),
    IncrementalOrderBook(OrderBookUpdate),
    Prices(PricesUpdate),
    MyTrades(MyTradesUpdate),
    MarketTrades(MarketTradesCreated),
    MyOrders(MyOrdersUpdate),
    Balances(BalancesUpdate),
    Consumption(MarketConsumption),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderBookUpdate {
    Snapshot(OrderBook),
    Diff(OrderBookDiff),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PricesUpdate {
    Snapshot(Prices),
    Delta(Prices),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MyTradesUpdate {
    Snapshot(Vec<Trade>),
    Created(Vec<Trade>),
    Updated(Vec<Trade>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MyOrdersUpdate {
    Snapshot(Vec<Order>),
    Created(Vec<Order>),
    Updated(Vec<Order>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BalancesUpdate {
    Snapshot(Vec<Balance>),
    Updated(Vec<UpdatedBalance>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketTradesCreated {
    pub sequence_number: u64,
    pub market_id: MarketId,
    pub trades: Vec<MarketTrade>,
}

impl Publication {
    /// Whether this payload replaces the topic's state rather than amending it
    pub fn is_snapshot(&self) -> bool {
        match self {
            Publication::OrderBook(_) | Publication::Consumption(_) => true,
            Publication::IncrementalOrderBook(update) => {
                matches!(update, OrderBookUpdate::Snapshot(_))
            }
            Publication::Prices(update) => matches!(update, PricesUpdate::Snapshot(_)),
            Publication::MyTrades(update) => matches!(update, MyTradesUpdate::Snapshot(_)),
            Publication::MarketTrades(_) => false,
            Publication::MyOrders(update) => matches!(update, MyOrdersUpdate::Snapshot(_)),
            Publication::Balances(update) => matches!(update, BalancesUpdate::Snapshot(_)),
        }
    }
}

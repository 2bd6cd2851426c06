use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MarketId, OhlcDuration};

/// A subscribable server-side event stream
///
/// Two topics are equal when both the kind and every parameter match, so a
/// registry of topics never holds the same stream twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Topic {
    OrderBook { market_id: MarketId },
    IncrementalOrderBook { market_id: MarketId },
    Prices { market_id: MarketId, duration: OhlcDuration },
    MyTrades,
    MarketTrades { market_id: MarketId },
    MyOrders,
    Balances,
    Consumption { market_id: MarketId },
}

/// Parameterless discriminant of a [`Topic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    OrderBook,
    IncrementalOrderBook,
    Prices,
    MyTrades,
    MarketTrades,
    MyOrders,
    Balances,
    Consumption,
}

impl Topic {
    pub fn order_book(market_id: impl Into<MarketId>) -> Self {
        Topic::OrderBook {
            market_id: market_id.into(),
        }
    }

    pub fn incremental_order_book(market_id: impl Into<MarketId>) -> Self {
        Topic::IncrementalOrderBook {
            market_id: market_id.into(),
        }
    }

    pub fn prices(market_id: impl Into<MarketId>, duration: OhlcDuration) -> Self {
        Topic::Prices {
            market_id: market_id.into(),
            duration,
        }
    }

    pub fn market_trades(market_id: impl Into<MarketId>) -> Self {
        Topic::MarketTrades {
            market_id: market_id.into(),
        }
    }

    pub fn consumption(market_id: impl Into<MarketId>) -> Self {
        Topic::Consumption {
            market_id: market_id.into(),
        }
    }

    pub fn kind(&self) -> TopicKind {
        match self {
            Topic::OrderBook { .. } => TopicKind::OrderBook,
            Topic::IncrementalOrderBook { .. } => TopicKind::IncrementalOrderBook,
            Topic::Prices { .. } => TopicKind::Prices,
            Topic::MyTrades => TopicKind::MyTrades,
            Topic::MarketTrades { .. } => TopicKind::MarketTrades,
            Topic::MyOrders => TopicKind::MyOrders,
            Topic::Balances => TopicKind::Balances,
            Topic::Consumption { .. } => TopicKind::Consumption,
        }
    }

    /// Market the topic is scoped to, if any
    pub fn market_id(&self) -> Option<&MarketId> {
        match self {
            Topic::OrderBook { market_id }
            | Topic::IncrementalOrderBook { market_id }
            | Topic::Prices { market_id, .. }
            | Topic::MarketTrades { market_id }
            | Topic::Consumption { market_id } => Some(market_id),
            Topic::MyTrades | Topic::MyOrders | Topic::Balances => None,
        }
    }
}

impl TopicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKind::OrderBook => "OrderBook",
            TopicKind::IncrementalOrderBook => "IncrementalOrderBook",
            TopicKind::Prices => "Prices",
            TopicKind::MyTrades => "MyTrades",
            TopicKind::MarketTrades => "MarketTrades",
            TopicKind::MyOrders => "MyOrders",
            TopicKind::Balances => "Balances",
            TopicKind::Consumption => "Consumption",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Prices {
                market_id,
                duration,
            } => write!(f, "Prices({}, {})", market_id, duration),
            other => match other.market_id() {
                Some(market_id) => write!(f, "{}({})", other.kind(), market_id),
                None => write!(f, "{}", other.kind()),
            },
        }
    }
}

/// Which request a subscription acknowledgment answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckAction {
    Subscribe,
    Unsubscribe,
}

impl fmt::Display for AckAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckAction::Subscribe => f.write_str("subscribe"),
            AckAction::Unsubscribe => f.write_str("unsubscribe"),
        }
    }
}

/// Connection-scoped server features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Feature {
    /// Cancel open orders in these markets (all markets when empty) if the
    /// connection drops without the feature being unset first
    CancelOnDisconnect { market_ids: Vec<MarketId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    CancelOnDisconnect,
}

/// Frames sent from the client to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    Ping,
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
    SetFeature { feature: Feature },
    UnsetFeature { feature: FeatureKind },
}

impl ClientMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

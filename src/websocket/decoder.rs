//! Frame decoding.
//!
//! Every inbound frame is classified as exactly one of heartbeat,
//! subscription acknowledgment, or publication. Publication payloads are
//! dispatched on the topic kind plus the payload's own `type` discriminator;
//! anything that does not line up is reported as a [`DecodeError`] and left
//! for the client to drop.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::envelope::{
    BalancesUpdate, Envelope, MarketTradesCreated, MyOrdersUpdate, MyTradesUpdate,
    OrderBookUpdate, PricesUpdate, Publication,
};
use super::transport::Frame;
use crate::error::DecodeError;
use crate::types::{
    AckAction, Balance, MarketConsumption, MarketId, MarketTrade, Order, OrderBook, OrderBookDiff,
    Prices, Topic, TopicKind, Trade, UpdatedBalance,
};

/// Payload discriminators the server is known to send
const KNOWN_PAYLOADS: &[&str] = &[
    "OrderBook",
    "OrderBookDiff",
    "Prices",
    "MyTrades",
    "MyTradesCreated",
    "MyTradesUpdated",
    "MarketTradesCreated",
    "MyOrders",
    "MyOrdersCreated",
    "MyOrdersUpdated",
    "Balances",
    "BalancesUpdated",
    "Consumption",
];

#[derive(Deserialize)]
struct AckFrame {
    topic: Value,
    action: AckAction,
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct PublishFrame {
    topic: Value,
    data: Value,
}

#[derive(Deserialize)]
struct TradesData {
    trades: Vec<Trade>,
}

#[derive(Deserialize)]
struct OrdersData {
    orders: Vec<Order>,
}

#[derive(Deserialize)]
struct BalancesData {
    balances: Vec<Balance>,
}

#[derive(Deserialize)]
struct UpdatedBalancesData {
    balances: Vec<UpdatedBalance>,
}

#[derive(Deserialize)]
struct ConsumptionData {
    consumption: MarketConsumption,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketTradesData {
    sequence_number: u64,
    market_id: MarketId,
    trades: Vec<MarketTrade>,
}

/// Decode a raw frame into an [`Envelope`]
pub fn decode(frame: &Frame) -> Result<Envelope, DecodeError> {
    match frame {
        Frame::Text(text) => decode_text(text),
        Frame::Binary(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
            decode_text(text)
        }
    }
}

/// Decode a JSON text frame into an [`Envelope`]
pub fn decode_text(text: &str) -> Result<Envelope, DecodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut value: Value = serde_json::from_str(trimmed)?;
    let message_type = take_type(&mut value)
        .ok_or_else(|| DecodeError::UnknownMessageType("<missing>".to_string()))?;

    match message_type.as_str() {
        "Pong" => Ok(Envelope::Heartbeat),
        "SubscriptionAck" => {
            let ack: AckFrame = parse(value)?;
            Ok(Envelope::Ack {
                topic: decode_topic(ack.topic)?,
                action: ack.action,
                success: ack.success,
                reason: ack.error,
            })
        }
        "Publish" => {
            let publish: PublishFrame = parse(value)?;
            let topic = decode_topic(publish.topic)?;
            let payload = decode_payload(topic.kind(), publish.data)?;
            Ok(Envelope::Publish { topic, payload })
        }
        _ => Err(DecodeError::UnknownMessageType(message_type)),
    }
}

fn decode_topic(value: Value) -> Result<Topic, DecodeError> {
    let described = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());

    serde_json::from_value(value).map_err(|e| DecodeError::UnknownTopic(format!("{described}: {e}")))
}

fn decode_payload(kind: TopicKind, mut data: Value) -> Result<Publication, DecodeError> {
    let discriminator = take_type(&mut data).unwrap_or_default();

    let publication = match (kind, discriminator.as_str()) {
        (TopicKind::OrderBook, "OrderBook") => Publication::OrderBook(parse::<OrderBook>(data)?),
        (TopicKind::IncrementalOrderBook, "OrderBook") => {
            Publication::IncrementalOrderBook(OrderBookUpdate::Snapshot(parse(data)?))
        }
        (TopicKind::IncrementalOrderBook, "OrderBookDiff") => {
            Publication::IncrementalOrderBook(OrderBookUpdate::Diff(parse::<OrderBookDiff>(data)?))
        }
        (TopicKind::Prices, "Prices") => {
            let prices: Prices = parse(data)?;
            if prices.full {
                Publication::Prices(PricesUpdate::Snapshot(prices))
            } else {
                Publication::Prices(PricesUpdate::Delta(prices))
            }
        }
        (TopicKind::MyTrades, "MyTrades") => {
            Publication::MyTrades(MyTradesUpdate::Snapshot(parse::<TradesData>(data)?.trades))
        }
        (TopicKind::MyTrades, "MyTradesCreated") => {
            Publication::MyTrades(MyTradesUpdate::Created(parse::<TradesData>(data)?.trades))
        }
        (TopicKind::MyTrades, "MyTradesUpdated") => {
            Publication::MyTrades(MyTradesUpdate::Updated(parse::<TradesData>(data)?.trades))
        }
        (TopicKind::MarketTrades, "MarketTradesCreated") => {
            let created: MarketTradesData = parse(data)?;
            Publication::MarketTrades(MarketTradesCreated {
                sequence_number: created.sequence_number,
                market_id: created.market_id,
                trades: created.trades,
            })
        }
        (TopicKind::MyOrders, "MyOrders") => {
            Publication::MyOrders(MyOrdersUpdate::Snapshot(parse::<OrdersData>(data)?.orders))
        }
        (TopicKind::MyOrders, "MyOrdersCreated") => {
            Publication::MyOrders(MyOrdersUpdate::Created(parse::<OrdersData>(data)?.orders))
        }
        (TopicKind::MyOrders, "MyOrdersUpdated") => {
            Publication::MyOrders(MyOrdersUpdate::Updated(parse::<OrdersData>(data)?.orders))
        }
        (TopicKind::Balances, "Balances") => {
            Publication::Balances(BalancesUpdate::Snapshot(parse::<BalancesData>(data)?.balances))
        }
        (TopicKind::Balances, "BalancesUpdated") => Publication::Balances(BalancesUpdate::Updated(
            parse::<UpdatedBalancesData>(data)?.balances,
        )),
        (TopicKind::Consumption, "Consumption") => {
            Publication::Consumption(parse::<ConsumptionData>(data)?.consumption)
        }
        (topic, other) if KNOWN_PAYLOADS.contains(&other) => {
            return Err(DecodeError::PayloadMismatch {
                topic,
                discriminator: other.to_string(),
            })
        }
        (topic, other) => {
            return Err(DecodeError::UnknownPayload {
                topic,
                discriminator: other.to_string(),
            })
        }
    };

    Ok(publication)
}

fn take_type(value: &mut Value) -> Option<String> {
    match value.as_object_mut()?.remove("type")? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn parse<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(DecodeError::Json)
}

//! Reconnecting websocket client for the funkybit real-time API.
//!
//! [`ReconnectingClient`] owns one logical connection that outlives any
//! number of physical ones. Subscriptions live in a registry and are
//! replayed on every new session; acknowledgments are matched against the
//! requests of the session that sent them, so nothing from a dead
//! connection leaks into a live one.
//!
//! # Connection Management
//!
//! Dropped connections are retried according to the configured
//! [`BackoffPolicy`](crate::config::BackoffPolicy). Connection-scoped
//! settings such as cancel-on-disconnect are deliberately *not* replayed;
//! watch [`ReconnectingClient::state_changes`] to re-arm them.

mod backoff;
mod client;
mod decoder;
mod envelope;
mod fanout;
mod registry;
mod transport;
mod waiters;

#[cfg(test)]
mod mock;

pub use client::{ConnectionState, EnvelopeStream, ReconnectingClient};
pub use decoder::{decode, decode_text};
pub use envelope::{
    BalancesUpdate, Envelope, MarketTradesCreated, MyOrdersUpdate, MyTradesUpdate,
    OrderBookUpdate, PricesUpdate, Publication,
};
pub use fanout::is_private;
pub use registry::{PendingAcks, SessionGeneration, SubscriptionRegistry};
pub use transport::{Connector, Frame, Transport, WsConnector};
pub use waiters::{
    wait_for, wait_for_balance_above, wait_for_order_created, wait_for_order_status,
    wait_for_subscription, wait_for_trade_settled,
};

//! # funkybit-rs
//!
//! A Rust client library for the funkybit real-time websocket API.
//!
//! This library provides a type-safe interface for:
//! - Subscribing to market data (order books, prices, public trades, consumption)
//! - Following the caller's own orders, trades and balances
//! - Arming cancel-on-disconnect for open orders
//!
//! ## Features
//!
//! - **Automatic Reconnection**: Subscriptions survive dropped connections
//! - **Type Safety**: Closed enums for topics and payloads, newtypes for IDs
//! - **Proper Error Handling**: No panics, transport churn never leaks to callers
//! - **Decimal Precision**: Accurate decimal math for prices and amounts
//!

// Public modules
pub mod config;
pub mod error;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use config::{AuthTokenSource, BackoffPolicy, ClientConfig, ReconnectConfig};
pub use error::{DecodeError, Error, Result, TransportError};
pub use types::{
    AckAction, ClientOrderId, MarketId, OhlcDuration, OrderId, OrderStatus, Symbol, Topic,
    TradeId,
};

// Re-export the websocket client
pub use websocket::{
    ConnectionState, Envelope, EnvelopeStream, Publication, ReconnectingClient, SessionGeneration,
};

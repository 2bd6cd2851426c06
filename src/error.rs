use thiserror::Error;

use crate::types::{AckAction, Topic, TopicKind};

/// Result type for funkybit-rs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for funkybit-rs
///
/// Transport churn never shows up here: dropped connections are handled by
/// the reconnecting client and are only visible as gaps in the event stream.
#[derive(Debug, Error)]
pub enum Error {
    /// No live session to send a connection-scoped request on
    #[error("no live websocket session")]
    NotConnected,

    /// The client has been closed
    #[error("websocket client is closed")]
    Closed,

    /// The envelope stream ended before the awaited event arrived
    #[error("envelope stream ended")]
    StreamEnded,

    /// A waiter's deadline passed
    #[error("timed out waiting for websocket event")]
    Timeout,

    /// The server rejected a subscription request
    #[error("subscription to {topic} rejected: {reason}")]
    SubscriptionRejected { topic: Topic, reason: String },

    /// The configured API url cannot be turned into a websocket endpoint
    #[error("invalid api url: {0}")]
    InvalidUrl(String),

    /// A configuration value the client cannot run with
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reasons a single inbound frame could not be turned into an envelope.
///
/// Decode failures are per frame and never fatal on their own.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,

    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown message type `{0}`")]
    UnknownMessageType(String),

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("unknown payload `{discriminator}` for {topic} topic")]
    UnknownPayload {
        topic: TopicKind,
        discriminator: String,
    },

    #[error("payload `{discriminator}` does not belong to {topic} topic")]
    PayloadMismatch {
        topic: TopicKind,
        discriminator: String,
    },
}

/// Failures of the physical connection.
///
/// These never reach callers; every one of them ends the current session and
/// schedules a reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    /// The server refused the handshake with HTTP 418
    #[error("server is in maintenance mode")]
    Maintenance,

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("connection closed by peer")]
    Closed,

    #[error("no frame received within idle timeout")]
    IdleTimeout,

    #[error("{count} consecutive frames failed to decode")]
    TooManyDecodeFailures { count: u32 },
}

impl Error {
    pub(crate) fn rejected(topic: Topic, action: AckAction, reason: Option<String>) -> Self {
        Error::SubscriptionRejected {
            topic,
            reason: reason.unwrap_or_else(|| format!("{action} failed")),
        }
    }
}

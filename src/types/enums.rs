use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Partial,
    Filled,
    Cancelled,
    Expired,
    Rejected,
    Failed,
}

impl OrderStatus {
    /// Whether the order can no longer change
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Expired
                | OrderStatus::Rejected
                | OrderStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionRole {
    Taker,
    Maker,
}

/// On-chain settlement progress of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementStatus {
    Pending,
    Settling,
    PendingRollback,
    FailedSettling,
    Completed,
    Failed,
}

/// Which balance figure a balance update refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceType {
    Total,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LastTradeDirection {
    Up,
    Down,
    Unchanged,
}

/// Candle duration for price subscriptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OhlcDuration {
    P1M,
    #[default]
    P5M,
    P15M,
    P1H,
    P4H,
    P1D,
}

impl OhlcDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            OhlcDuration::P1M => "P1M",
            OhlcDuration::P5M => "P5M",
            OhlcDuration::P15M => "P15M",
            OhlcDuration::P1H => "P1H",
            OhlcDuration::P4H => "P4H",
            OhlcDuration::P1D => "P1D",
        }
    }

    /// Length of one candle
    pub fn interval(&self) -> chrono::Duration {
        match self {
            OhlcDuration::P1M => chrono::Duration::minutes(1),
            OhlcDuration::P5M => chrono::Duration::minutes(5),
            OhlcDuration::P15M => chrono::Duration::minutes(15),
            OhlcDuration::P1H => chrono::Duration::hours(1),
            OhlcDuration::P4H => chrono::Duration::hours(4),
            OhlcDuration::P1D => chrono::Duration::days(1),
        }
    }
}

impl fmt::Display for OhlcDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BalanceType, Symbol};

/// Full balance of one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub symbol: Symbol,
    pub total: Decimal,
    pub available: Decimal,
    pub last_updated: DateTime<Utc>,
    pub usdc_value: Decimal,
}

/// A single changed balance figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedBalance {
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub balance_type: BalanceType,
    pub value: Decimal,
    pub last_updated: DateTime<Utc>,
}

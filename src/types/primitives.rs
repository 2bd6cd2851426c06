use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Market identifier in `BASE/QUOTE` form, e.g. `BTC/USDC`
    MarketId
);
string_id!(
    /// Asset symbol, e.g. `USDC`
    Symbol
);
string_id!(
    /// Server-assigned order identifier
    OrderId
);
string_id!(
    /// Caller-assigned order identifier, used to correlate stream events
    ClientOrderId
);
string_id!(TradeId);

impl MarketId {
    /// Split into base and quote symbols
    ///
    /// Returns `None` when the id has no `/` separator.
    pub fn base_and_quote(&self) -> Option<(&str, &str)> {
        self.0.split_once('/')
    }
}

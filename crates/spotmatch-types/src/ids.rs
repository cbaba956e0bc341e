//! Identifiers used throughout SpotMatch.
//!
//! Order and user IDs are UUIDv7, so they sort by creation time. Trade IDs
//! are derived from the symbol and the per-symbol trade sequence, which makes
//! a replayed match produce the same ID.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::SpotmatchError;

/// UUID newtype with time-ordered construction, `Display` and `FromStr`.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = SpotmatchError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| SpotmatchError::InvalidOrder {
                    reason: format!("malformed {} {s}", $what),
                })
            }
        }
    };
}

uuid_id!(
    /// Identifier of an order, assigned by the engine on acceptance.
    OrderId,
    "order id"
);

uuid_id!(
    /// Identifier of a trading account.
    UserId,
    "user id"
);

uuid_id!(
    /// Identifier of a trade. Engines use [`TradeId::deterministic`].
    TradeId,
    "trade id"
);

impl UserId {
    /// The platform account that collects trading fees.
    pub const FEE_ACCOUNT: Self = Self(Uuid::nil());
}

impl TradeId {
    /// ID of the `sequence`-th trade of `symbol`: the first 16 bytes of a
    /// domain-separated SHA-256.
    #[must_use]
    pub fn deterministic(symbol: &str, sequence: u64) -> Self {
        let digest = Sha256::new()
            .chain_update(b"spotmatch:trade_id:v1:")
            .chain_update(symbol.as_bytes())
            .chain_update(b":")
            .chain_update(sequence.to_le_bytes())
            .finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

/// The two currencies of a market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MarketPair {
    pub base: String,
    pub quote: String,
}

impl MarketPair {
    #[must_use]
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Split a `BASE/QUOTE` symbol.
    pub fn parse(symbol: &str) -> Result<Self, SpotmatchError> {
        let Some((base, quote)) = symbol.split_once('/') else {
            return Err(SpotmatchError::MarketNotFound(symbol.to_string()));
        };
        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(SpotmatchError::MarketNotFound(symbol.to_string()));
        }
        Ok(Self::new(base, quote))
    }

    #[must_use]
    pub fn symbol(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MarketPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_time_ordered() {
        let first = OrderId::new();
        let second = OrderId::new();
        assert!(first < second);
    }

    #[test]
    fn ids_round_trip_through_strings() {
        let order = OrderId::new();
        assert_eq!(order.to_string().parse::<OrderId>().unwrap(), order);
        let user = UserId::new();
        assert_eq!(user.to_string().parse::<UserId>().unwrap(), user);

        let err = "not-a-uuid".parse::<UserId>().unwrap_err();
        assert!(err.to_string().contains("malformed user id"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let user = UserId::new();
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, format!("\"{user}\""));
    }

    #[test]
    fn trade_ids_depend_on_symbol_and_sequence() {
        let id = TradeId::deterministic("BTC/USDT", 7);
        assert_eq!(id, TradeId::deterministic("BTC/USDT", 7));
        assert_ne!(id, TradeId::deterministic("BTC/USDT", 8));
        assert_ne!(id, TradeId::deterministic("ETH/USDT", 7));
    }

    #[test]
    fn pair_parsing() {
        let pair = MarketPair::new("BTC", "USDT");
        assert_eq!(pair.symbol(), "BTC/USDT");
        assert_eq!(MarketPair::parse("BTC/USDT").unwrap(), pair);
        for bad in ["BTCUSDT", "/USDT", "BTC/", "A/B/C"] {
            assert!(MarketPair::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn fee_account_is_reserved() {
        assert_eq!(UserId::FEE_ACCOUNT.0, Uuid::nil());
        assert_ne!(UserId::new(), UserId::FEE_ACCOUNT);
    }
}

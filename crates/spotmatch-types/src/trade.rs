//! Trade types produced by the matcher.
//!
//! A [`Trade`] is the immutable record of one match between a taker and a
//! maker. It executes at the maker's price and is created exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderSide, TradeId, UserId};

/// A single fill between the incoming (taker) and resting (maker) order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic from `symbol` + `sequence`.
    pub id: TradeId,
    /// Per-symbol total order of trades, starting at 1.
    pub sequence: u64,
    pub symbol: String,
    pub taker_order_id: OrderId,
    pub taker_user_id: UserId,
    pub maker_order_id: OrderId,
    pub maker_user_id: UserId,
    /// Which side the taker was on.
    pub taker_side: OrderSide,
    /// Execution price: the maker's resting price.
    pub price: i128,
    /// Executed quantity in base currency.
    pub amount: i128,
    /// Quote cost = price × amount, rounded down.
    pub cost: i128,
    pub maker_fee: i128,
    pub taker_fee: i128,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Returns `true` if the taker was buying.
    #[must_use]
    pub fn taker_is_buyer(&self) -> bool {
        self.taker_side == OrderSide::Buy
    }

    /// `(buyer, seller)` user IDs.
    #[must_use]
    pub fn buyer_seller(&self) -> (UserId, UserId) {
        if self.taker_is_buyer() {
            (self.taker_user_id, self.maker_user_id)
        } else {
            (self.maker_user_id, self.taker_user_id)
        }
    }

    /// Total fee collected on this trade.
    #[must_use]
    pub fn total_fee(&self) -> i128 {
        self.maker_fee + self.taker_fee
    }

    /// Milliseconds since the UNIX epoch.
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}#{}] taker {} {} @ {} = {}",
            self.symbol, self.sequence, self.taker_side, self.amount, self.price, self.cost,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade() -> Trade {
        Trade {
            id: TradeId::deterministic("BTC/USDT", 1),
            sequence: 1,
            symbol: "BTC/USDT".to_string(),
            taker_order_id: OrderId::new(),
            taker_user_id: UserId::new(),
            maker_order_id: OrderId::new(),
            maker_user_id: UserId::new(),
            taker_side: OrderSide::Buy,
            price: 10_000,
            amount: 50_000_000,
            cost: 5_000,
            maker_fee: 5,
            taker_fee: 5,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn buyer_seller_follow_taker_side() {
        let mut t = make_trade();
        assert!(t.taker_is_buyer());
        assert_eq!(t.buyer_seller(), (t.taker_user_id, t.maker_user_id));
        t.taker_side = OrderSide::Sell;
        assert_eq!(t.buyer_seller(), (t.maker_user_id, t.taker_user_id));
    }

    #[test]
    fn trade_display() {
        let t = make_trade();
        let s = format!("{t}");
        assert!(s.contains("BTC/USDT#1"));
        assert!(s.contains("5000"));
        assert_eq!(t.total_fee(), 10);
    }

    #[test]
    fn trade_serde_roundtrip() {
        let trade = make_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}

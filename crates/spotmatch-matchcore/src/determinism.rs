//! Trade-root hashing for replay verification.
//!
//! Replaying the same order stream through a fresh book must produce the
//! same trades. The `trade_root` hashes every trade's economic content in
//! sequence order so two runs can be compared without diffing payloads.
//! Timestamps are excluded.

use spotmatch_types::Trade;
use sha2::{Digest, Sha256};

/// Hash over the trades in the given order.
#[must_use]
pub fn compute_trade_root(trades: &[Trade]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"spotmatch:trade_root:v1:");
    hasher.update((trades.len() as u64).to_le_bytes());

    for trade in trades {
        hasher.update(trade.id.0.as_bytes());
        hasher.update(trade.sequence.to_le_bytes());
        hasher.update(trade.symbol.as_bytes());
        hasher.update(trade.taker_order_id.0.as_bytes());
        hasher.update(trade.maker_order_id.0.as_bytes());
        hasher.update(trade.taker_user_id.0.as_bytes());
        hasher.update(trade.maker_user_id.0.as_bytes());
        hasher.update(trade.price.to_le_bytes());
        hasher.update(trade.amount.to_le_bytes());
        hasher.update(trade.cost.to_le_bytes());
        hasher.update(trade.taker_fee.to_le_bytes());
        hasher.update(trade.maker_fee.to_le_bytes());
    }

    hasher.finalize().into()
}

/// Hex form of [`compute_trade_root`], for logs.
#[must_use]
pub fn trade_root_hex(trades: &[Trade]) -> String {
    hex::encode(compute_trade_root(trades))
}

#[must_use]
pub fn verify_trade_root(trades: &[Trade], expected_root: &[u8; 32]) -> bool {
    compute_trade_root(trades) == *expected_root
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use spotmatch_types::*;
    use uuid::Uuid;

    use super::*;

    fn make_trade(sequence: u64) -> Trade {
        Trade {
            id: TradeId::deterministic("BTC/USDT", sequence),
            sequence,
            symbol: "BTC/USDT".to_string(),
            taker_order_id: OrderId(Uuid::from_bytes([1; 16])),
            taker_user_id: UserId(Uuid::from_bytes([2; 16])),
            maker_order_id: OrderId(Uuid::from_bytes([3; 16])),
            maker_user_id: UserId(Uuid::from_bytes([4; 16])),
            taker_side: OrderSide::Buy,
            price: 5_000_000,
            amount: 100_000_000,
            cost: 5_000_000,
            maker_fee: 5_000,
            taker_fee: 5_000,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn same_trades_same_root() {
        let trades = vec![make_trade(1), make_trade(2)];
        assert_eq!(compute_trade_root(&trades), compute_trade_root(&trades));
        assert_eq!(compute_trade_root(&[]), compute_trade_root(&[]));
    }

    #[test]
    fn timestamps_do_not_affect_root() {
        let a = make_trade(1);
        let mut b = a.clone();
        b.timestamp += Duration::seconds(30);
        assert_eq!(compute_trade_root(&[a]), compute_trade_root(&[b]));
    }

    #[test]
    fn order_and_content_matter() {
        let t1 = make_trade(1);
        let t2 = make_trade(2);
        assert_ne!(
            compute_trade_root(&[t1.clone(), t2.clone()]),
            compute_trade_root(&[t2, t1.clone()])
        );
        let mut cheaper = t1.clone();
        cheaper.taker_fee -= 1;
        assert_ne!(compute_trade_root(&[t1]), compute_trade_root(&[cheaper]));
    }

    #[test]
    fn verify_and_hex() {
        let trades = vec![make_trade(1)];
        let root = compute_trade_root(&trades);
        assert!(verify_trade_root(&trades, &root));
        assert!(!verify_trade_root(&trades, &[0xAB; 32]));
        assert_eq!(trade_root_hex(&trades), hex::encode(root));
        assert_eq!(trade_root_hex(&trades).len(), 64);
    }
}

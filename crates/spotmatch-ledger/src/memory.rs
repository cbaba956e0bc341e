//! In-memory [`LedgerStore`].
//!
//! One mutex guards all rows, so each call sees and leaves a consistent
//! state. Mutating calls validate every row they touch before writing any.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use spotmatch_types::{
    BalanceEntry, Order, OrderId, Result, SpotmatchError, Trade, TradeId, WalletKey,
};
use tracing::debug;

use crate::store::{BalanceDelta, LedgerStore, MatchCommit};
use crate::supply_conservation::SupplyConservation;

#[derive(Default)]
struct LedgerState {
    wallets: HashMap<WalletKey, BalanceEntry>,
    orders: HashMap<OrderId, Order>,
    /// Trades per symbol, in sequence order.
    trades: BTreeMap<String, Vec<Trade>>,
    trade_ids: HashMap<TradeId, String>,
    supply: SupplyConservation,
}

impl LedgerState {
    fn entry(&self, key: &WalletKey) -> BalanceEntry {
        self.wallets.get(key).copied().unwrap_or_default()
    }

    /// Compute the rows `deltas` produce without writing them.
    fn stage(&self, deltas: &[BalanceDelta]) -> Result<HashMap<WalletKey, BalanceEntry>> {
        let mut staged: HashMap<WalletKey, BalanceEntry> = HashMap::new();
        for delta in deltas {
            let current = staged
                .get(&delta.key)
                .copied()
                .unwrap_or_else(|| self.entry(&delta.key));
            let next = BalanceEntry {
                balance: current
                    .balance
                    .checked_add(delta.balance)
                    .ok_or(SpotmatchError::Overflow)?,
                in_order: current
                    .in_order
                    .checked_add(delta.in_order)
                    .ok_or(SpotmatchError::Overflow)?,
            };
            if next.balance < 0 {
                return Err(SpotmatchError::InsufficientBalance {
                    currency: delta.key.currency.clone(),
                    needed: -delta.balance,
                    available: current.balance,
                });
            }
            if next.in_order < 0 {
                return Err(SpotmatchError::InsufficientLocked {
                    currency: delta.key.currency.clone(),
                });
            }
            staged.insert(delta.key.clone(), next);
        }
        Ok(staged)
    }

    fn apply(&mut self, deltas: &[BalanceDelta]) -> Result<()> {
        let staged = self.stage(deltas)?;
        self.wallets.extend(staged);
        Ok(())
    }
}

/// Ledger kept entirely in process memory.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| SpotmatchError::Storage("ledger mutex poisoned".to_string()))
    }

    /// Check that the wallets holding `currency` add up to what was
    /// deposited into it.
    pub fn verify_supply(&self, currency: &str) -> Result<()> {
        let state = self.state()?;
        let actual = state
            .wallets
            .iter()
            .filter(|(key, _)| key.currency == currency)
            .map(|(_, entry)| entry.total())
            .sum();
        state.supply.verify(currency, actual)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn deposit(&self, key: &WalletKey, amount: i128) -> Result<BalanceEntry> {
        if amount <= 0 {
            return Err(SpotmatchError::InvalidNumber(format!(
                "deposit amount {amount} must be positive"
            )));
        }
        let mut state = self.state()?;
        state.apply(&[BalanceDelta {
            key: key.clone(),
            balance: amount,
            in_order: 0,
        }])?;
        state.supply.record_deposit(&key.currency, amount);
        Ok(state.entry(key))
    }

    async fn balance(&self, key: &WalletKey) -> Result<BalanceEntry> {
        Ok(self.state()?.entry(key))
    }

    async fn lock_funds(&self, key: &WalletKey, amount: i128) -> Result<()> {
        let mut state = self.state()?;
        let current = state.entry(key);
        if current.balance < amount {
            return Err(SpotmatchError::InsufficientBalance {
                currency: key.currency.clone(),
                needed: amount,
                available: current.balance,
            });
        }
        state.apply(&[BalanceDelta {
            key: key.clone(),
            balance: -amount,
            in_order: amount,
        }])
    }

    async fn release_funds(&self, key: &WalletKey, amount: i128) -> Result<()> {
        self.state()?.apply(&[BalanceDelta {
            key: key.clone(),
            balance: amount,
            in_order: -amount,
        }])
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state()?;
        if state.orders.contains_key(&order.id) {
            return Err(SpotmatchError::DuplicateOrder(order.id));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn commit_match(&self, commit: &MatchCommit) -> Result<()> {
        let mut state = self.state()?;
        let trade = &commit.trade;
        if state.trade_ids.contains_key(&trade.id) {
            return Err(SpotmatchError::TradeAlreadySettled(trade.id));
        }
        for order in [&commit.taker, &commit.maker] {
            if !state.orders.contains_key(&order.id) {
                return Err(SpotmatchError::OrderNotFound(order.id));
            }
        }
        commit.check_conservation()?;

        state.apply(commit.deltas())?;
        state.orders.insert(commit.taker.id, commit.taker.clone());
        state.orders.insert(commit.maker.id, commit.maker.clone());
        state.trade_ids.insert(trade.id, trade.symbol.clone());
        state
            .trades
            .entry(trade.symbol.clone())
            .or_default()
            .push(trade.clone());
        debug!(trade_id = %trade.id, sequence = trade.sequence, "match committed");
        Ok(())
    }

    async fn finish_order(&self, order: &Order, release: &WalletKey) -> Result<()> {
        if !order.status.is_terminal() {
            return Err(SpotmatchError::InvalidOrder {
                reason: format!("order {} is still {}", order.id, order.status),
            });
        }
        let mut state = self.state()?;
        if !state.orders.contains_key(&order.id) {
            return Err(SpotmatchError::OrderNotFound(order.id));
        }
        if order.locked > 0 {
            state.apply(&[BalanceDelta {
                key: release.clone(),
                balance: order.locked,
                in_order: -order.locked,
            }])?;
        }
        let mut row = order.clone();
        row.locked = 0;
        state.orders.insert(row.id, row);
        Ok(())
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        Ok(self.state()?.orders.get(order_id).cloned())
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<Order>> {
        let state = self.state()?;
        let mut open: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.symbol == symbol && !o.status.is_terminal())
            .cloned()
            .collect();
        open.sort_by_key(|o| o.sequence);
        Ok(open)
    }

    async fn trades(&self, symbol: &str) -> Result<Vec<Trade>> {
        Ok(self
            .state()?
            .trades
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }

    async fn total_supply(&self, currency: &str) -> Result<i128> {
        Ok(self
            .state()?
            .wallets
            .iter()
            .filter(|(key, _)| key.currency == currency)
            .map(|(_, entry)| entry.total())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use spotmatch_types::*;

    use super::*;

    fn wallet(user: UserId, currency: &str) -> WalletKey {
        WalletKey::new(user, currency, WalletType::Spot)
    }

    #[tokio::test]
    async fn deposit_and_lock() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        let key = wallet(user, "USDT");

        let entry = ledger.deposit(&key, 10_000).await.unwrap();
        assert_eq!(entry.balance, 10_000);

        ledger.lock_funds(&key, 4_000).await.unwrap();
        let entry = ledger.balance(&key).await.unwrap();
        assert_eq!(entry.balance, 6_000);
        assert_eq!(entry.in_order, 4_000);

        ledger.release_funds(&key, 1_000).await.unwrap();
        let entry = ledger.balance(&key).await.unwrap();
        assert_eq!(entry.balance, 7_000);
        assert_eq!(entry.in_order, 3_000);
        ledger.verify_supply("USDT").unwrap();
    }

    #[tokio::test]
    async fn lock_beyond_balance_changes_nothing() {
        let ledger = MemoryLedger::new();
        let key = wallet(UserId::new(), "BTC");
        ledger.deposit(&key, 100).await.unwrap();

        let err = ledger.lock_funds(&key, 101).await.unwrap_err();
        assert!(matches!(
            err,
            SpotmatchError::InsufficientBalance { needed: 101, available: 100, .. }
        ));
        assert_eq!(ledger.balance(&key).await.unwrap().balance, 100);
        assert!(ledger.release_funds(&key, 1).await.is_err());
    }

    #[tokio::test]
    async fn rejects_non_positive_deposit() {
        let ledger = MemoryLedger::new();
        assert!(ledger.deposit(&wallet(UserId::new(), "BTC"), 0).await.is_err());
    }

    #[tokio::test]
    async fn finish_order_releases_lock() {
        let ledger = MemoryLedger::new();
        let user = UserId::new();
        let key = wallet(user, "USDT");
        ledger.deposit(&key, 5_000).await.unwrap();
        ledger.lock_funds(&key, 5_000).await.unwrap();

        let mut order = Order::dummy_limit_for_user(user, OrderSide::Buy, 100, 50);
        order.locked = 5_000;
        ledger.insert_order(&order).await.unwrap();
        assert!(matches!(
            ledger.insert_order(&order).await,
            Err(SpotmatchError::DuplicateOrder(_))
        ));
        assert!(ledger.finish_order(&order, &key).await.is_err());

        order.cancel().unwrap();
        ledger.finish_order(&order, &key).await.unwrap();

        let entry = ledger.balance(&key).await.unwrap();
        assert_eq!(entry, BalanceEntry { balance: 5_000, in_order: 0 });
        let stored = ledger.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert_eq!(stored.locked, 0);
        assert!(ledger.open_orders("BTC/USDT").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_orders_sorted_by_sequence() {
        let ledger = MemoryLedger::new();
        for seq in [3, 1, 2] {
            let mut order = Order::dummy_limit(OrderSide::Sell, 100, 1);
            order.sequence = seq;
            ledger.insert_order(&order).await.unwrap();
        }
        let seqs: Vec<u64> = ledger
            .open_orders("BTC/USDT")
            .await
            .unwrap()
            .iter()
            .map(|o| o.sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(ledger.open_orders("ETH/USDT").await.unwrap().is_empty());
    }
}

//! Wallet balance types.
//!
//! Every `(user, currency, wallet type)` has a `balance` (available for new
//! orders) and an `in_order` amount (locked by open orders). Values are
//! integers at the precision of the market that touches them.

use serde::{Deserialize, Serialize};

use crate::{UserId, WalletType};

/// Key of a wallet row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WalletKey {
    pub user_id: UserId,
    pub currency: String,
    pub wallet_type: WalletType,
}

impl WalletKey {
    #[must_use]
    pub fn new(user_id: UserId, currency: impl Into<String>, wallet_type: WalletType) -> Self {
        Self {
            user_id,
            currency: currency.into(),
            wallet_type,
        }
    }
}

/// A single balance entry for a wallet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Available for new orders / withdrawal.
    pub balance: i128,
    /// Locked by open orders.
    pub in_order: i128,
}

impl BalanceEntry {
    /// Total balance (available + locked).
    #[must_use]
    pub fn total(&self) -> i128 {
        self.balance + self.in_order
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.balance == 0 && self.in_order == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_entry_default_is_zero() {
        let entry = BalanceEntry::default();
        assert_eq!(entry.balance, 0);
        assert_eq!(entry.in_order, 0);
        assert!(entry.is_zero());
    }

    #[test]
    fn balance_entry_total() {
        let entry = BalanceEntry {
            balance: 100,
            in_order: 50,
        };
        assert_eq!(entry.total(), 150);
        assert!(!entry.is_zero());
    }

    #[test]
    fn wallet_key_ordering_groups_by_user() {
        let user = UserId::new();
        let a = WalletKey::new(user, "BTC", WalletType::Spot);
        let b = WalletKey::new(user, "USDT", WalletType::Spot);
        assert!(a < b);
    }
}

//! Supply conservation check.
//!
//! Settlement only moves value between wallets (fees included, they land
//! in the fee account), so for every currency:
//! ```text
//! Σ(balance + in_order) == Σ(deposits) - Σ(withdrawals)
//! ```

use std::collections::HashMap;

use spotmatch_types::{Result, SpotmatchError};

/// Per-currency deposit and withdrawal totals.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    deposits: HashMap<String, i128>,
    withdrawals: HashMap<String, i128>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, currency: &str, amount: i128) {
        *self.deposits.entry(currency.to_string()).or_insert(0) += amount;
    }

    pub fn record_withdrawal(&mut self, currency: &str, amount: i128) {
        *self.withdrawals.entry(currency.to_string()).or_insert(0) += amount;
    }

    #[must_use]
    pub fn total_deposits(&self, currency: &str) -> i128 {
        self.deposits.get(currency).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_withdrawals(&self, currency: &str) -> i128 {
        self.withdrawals.get(currency).copied().unwrap_or(0)
    }

    /// Deposits minus withdrawals.
    #[must_use]
    pub fn expected_supply(&self, currency: &str) -> i128 {
        self.total_deposits(currency) - self.total_withdrawals(currency)
    }

    /// # Errors
    /// [`SpotmatchError::SupplyInvariantViolation`] if `actual_supply`
    /// differs from the expected supply.
    pub fn verify(&self, currency: &str, actual_supply: i128) -> Result<()> {
        let expected = self.expected_supply(currency);
        if actual_supply != expected {
            return Err(SpotmatchError::SupplyInvariantViolation {
                reason: format!(
                    "{currency}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(currency),
                    self.total_withdrawals(currency),
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply("BTC"), 0);
        assert!(sc.verify("BTC", 0).is_ok());
    }

    #[test]
    fn deposits_and_withdrawals() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("USDT", 1_000);
        sc.record_deposit("USDT", 500);
        sc.record_withdrawal("USDT", 300);
        assert_eq!(sc.expected_supply("USDT"), 1_200);
        assert!(sc.verify("USDT", 1_200).is_ok());
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("BTC", 10);
        let err = sc.verify("BTC", 11).unwrap_err();
        assert!(matches!(err, SpotmatchError::SupplyInvariantViolation { .. }));
    }

    #[test]
    fn currencies_are_independent() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit("BTC", 5);
        sc.record_deposit("USDT", 50_000);
        assert!(sc.verify("BTC", 5).is_ok());
        assert!(sc.verify("USDT", 50_000).is_ok());
        assert!(sc.verify("ETH", 1).is_err());
    }
}

//! Window of recently settled trades.
//!
//! A trade settles at most once. The window remembers the last `capacity`
//! trade IDs; an engine derives IDs from a monotonic sequence, so a trade
//! that has aged out of the window is never offered again.

use std::collections::{HashSet, VecDeque};

use spotmatch_types::{Result, SpotmatchError, TradeId};

#[derive(Debug)]
pub struct SettledTrades {
    members: HashSet<TradeId>,
    arrival: VecDeque<TradeId>,
    capacity: usize,
}

impl SettledTrades {
    /// Remember up to `capacity` trades. A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let initial = capacity.min(4096);
        Self {
            members: HashSet::with_capacity(initial),
            arrival: VecDeque::with_capacity(initial),
            capacity,
        }
    }

    /// Record `id` as settled, evicting the oldest entry when full.
    ///
    /// # Errors
    /// [`SpotmatchError::TradeAlreadySettled`] if `id` is still in the window.
    pub fn record(&mut self, id: TradeId) -> Result<()> {
        if !self.members.insert(id) {
            return Err(SpotmatchError::TradeAlreadySettled(id));
        }
        self.arrival.push_back(id);
        while self.arrival.len() > self.capacity {
            if let Some(evicted) = self.arrival.pop_front() {
                self.members.remove(&evicted);
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: &TradeId) -> bool {
        self.members.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arrival.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrival.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(seq: u64) -> TradeId {
        TradeId::deterministic("BTC/USDT", seq)
    }

    #[test]
    fn second_record_is_rejected() {
        let mut window = SettledTrades::with_capacity(16);
        window.record(trade(1)).unwrap();
        assert!(window.contains(&trade(1)));

        match window.record(trade(1)) {
            Err(SpotmatchError::TradeAlreadySettled(id)) => assert_eq!(id, trade(1)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn oldest_entries_age_out() {
        let mut window = SettledTrades::with_capacity(3);
        for seq in 1..=5 {
            window.record(trade(seq)).unwrap();
        }
        assert_eq!(window.len(), 3);
        assert!(!window.contains(&trade(1)));
        assert!(!window.contains(&trade(2)));
        assert!((3..=5).all(|seq| window.contains(&trade(seq))));
    }

    #[test]
    fn same_sequence_on_other_symbol_is_distinct() {
        let mut window = SettledTrades::with_capacity(8);
        window.record(trade(1)).unwrap();
        window.record(TradeId::deterministic("ETH/USDT", 1)).unwrap();
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn zero_capacity_keeps_the_latest() {
        let mut window = SettledTrades::with_capacity(0);
        assert!(window.is_empty());
        window.record(trade(9)).unwrap();
        assert!(window.record(trade(9)).is_err());
        window.record(trade(10)).unwrap();
        assert!(!window.contains(&trade(9)));
    }
}

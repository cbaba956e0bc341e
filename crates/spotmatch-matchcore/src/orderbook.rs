//! The order book for a single market pair.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<i128>, PriceLevel>` -- highest price first
//! - **Asks** (sells): `BTreeMap<i128, PriceLevel>` -- lowest price first
//!
//! An auxiliary `HashMap<OrderId, (Side, Price)>` finds an order's level in
//! O(1) for cancels and fills.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use spotmatch_types::*;

use crate::price_level::PriceLevel;

/// One aggregated level of a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookLevel {
    pub price: i128,
    /// Sum of `remaining` over the level's orders.
    pub amount: i128,
}

/// Top-N aggregated levels per side, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepthSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Result of filling a resting order in place.
#[derive(Debug, Clone)]
pub struct BookFill {
    /// The maker after the fill.
    pub maker: Order,
    /// Fee charged to the maker for this fill.
    pub fee: i128,
    /// The maker was fully filled and left the book.
    pub removed: bool,
}

/// The order book for a single market pair.
#[derive(Debug)]
pub struct OrderBook {
    /// The market this book serves (e.g., BTC/USDT).
    pub market: MarketPair,
    bids: BTreeMap<Reverse<i128>, PriceLevel>,
    asks: BTreeMap<i128, PriceLevel>,
    index: HashMap<OrderId, (OrderSide, i128)>,
}

impl OrderBook {
    #[must_use]
    pub fn new(market: MarketPair) -> Self {
        Self {
            market,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion
    // =================================================================

    /// Rest an order at its limit price.
    ///
    /// Within a level the order is placed by its arrival `sequence`.
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if self.index.contains_key(&order.id) {
            return Err(SpotmatchError::DuplicateOrder(order.id));
        }
        let price = Self::resting_price(&order)?;
        self.index.insert(order.id, (order.side, price));

        match order.side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .insert(order),
            OrderSide::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .insert(order),
        }
        Ok(())
    }

    /// Put back a maker that was removed by a fill that had to be undone.
    ///
    /// The order regains its original time priority at its level.
    pub fn restore(&mut self, order: Order) -> Result<()> {
        self.insert(order)
    }

    /// Overwrite the state of a resting order (undo of a partial fill).
    pub fn replace(&mut self, order: Order) -> Result<()> {
        let slot = self
            .get_mut(&order.id)
            .ok_or(SpotmatchError::OrderNotFound(order.id))?;
        *slot = order;
        Ok(())
    }

    fn resting_price(order: &Order) -> Result<i128> {
        if order.remaining <= 0 || order.status.is_terminal() {
            return Err(SpotmatchError::InvalidOrder {
                reason: format!("order {} has nothing left to rest", order.id),
            });
        }
        match (order.order_type, order.price) {
            (OrderType::Limit, Some(price)) if price > 0 => Ok(price),
            _ => Err(SpotmatchError::InvalidOrder {
                reason: format!("order {} cannot rest without a limit price", order.id),
            }),
        }
    }

    // =================================================================
    // Removal and fills
    // =================================================================

    /// Remove an order. Idempotent: `None` if the order is not resting.
    pub fn cancel(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, price) = self.index.remove(order_id)?;
        let level = self.level_mut(side, price)?;
        let order = level.remove_order(order_id);
        if level.is_empty() {
            self.drop_level(side, price);
        }
        order
    }

    /// Fill part of a resting order in place.
    ///
    /// A fully filled maker is removed from the book, so no order with
    /// `remaining == 0` ever rests.
    pub fn apply_fill(
        &mut self,
        order_id: &OrderId,
        amount: i128,
        cost: i128,
        rate: FeeRate,
        price_precision: u32,
    ) -> Result<BookFill> {
        let (side, price) = *self
            .index
            .get(order_id)
            .ok_or(SpotmatchError::OrderNotFound(*order_id))?;
        let level = self
            .level_mut(side, price)
            .ok_or(SpotmatchError::OrderNotFound(*order_id))?;
        let order = level
            .get_mut(order_id)
            .ok_or(SpotmatchError::OrderNotFound(*order_id))?;

        let fee = order.apply_fill(amount, cost, rate, price_precision)?;
        let maker = order.clone();
        let removed = maker.is_filled();
        if removed {
            level.remove_order(order_id);
            if level.is_empty() {
                self.drop_level(side, price);
            }
            self.index.remove(order_id);
        }
        Ok(BookFill {
            maker,
            fee,
            removed,
        })
    }

    fn level_mut(&mut self, side: OrderSide, price: i128) -> Option<&mut PriceLevel> {
        match side {
            OrderSide::Buy => self.bids.get_mut(&Reverse(price)),
            OrderSide::Sell => self.asks.get_mut(&price),
        }
    }

    fn drop_level(&mut self, side: OrderSide, price: i128) {
        match side {
            OrderSide::Buy => self.bids.remove(&Reverse(price)),
            OrderSide::Sell => self.asks.remove(&price),
        };
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        let (side, price) = self.index.get(order_id)?;
        match side {
            OrderSide::Buy => self.bids.get(&Reverse(*price))?.get(order_id),
            OrderSide::Sell => self.asks.get(price)?.get(order_id),
        }
    }

    fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        let (side, price) = *self.index.get(order_id)?;
        self.level_mut(side, price)?.get_mut(order_id)
    }

    /// Highest-priority resting order on `side`.
    #[must_use]
    pub fn front(&self, side: OrderSide) -> Option<&Order> {
        match side {
            OrderSide::Buy => self.bids.values().next()?.front(),
            OrderSide::Sell => self.asks.values().next()?.front(),
        }
    }

    /// Best (highest) bid price.
    #[must_use]
    pub fn best_bid(&self) -> Option<i128> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Best (lowest) ask price.
    #[must_use]
    pub fn best_ask(&self) -> Option<i128> {
        self.asks.keys().next().copied()
    }

    #[must_use]
    pub fn spread(&self) -> Option<i128> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Mid price rounded down to the price precision.
    #[must_use]
    pub fn mid_price(&self) -> Option<i128> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        Some((bid + ask).div_euclid(2))
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    #[must_use]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// All resting orders owned by `user_id`, bids first.
    #[must_use]
    pub fn orders_for_user(&self, user_id: UserId) -> Vec<&Order> {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.orders.iter())
            .filter(|o| o.user_id == user_id)
            .collect()
    }

    /// Top `depth` aggregated levels per side.
    #[must_use]
    pub fn snapshot(&self, depth: usize) -> DepthSnapshot {
        let aggregate = |level: &PriceLevel| BookLevel {
            price: level.price,
            amount: level.total_remaining(),
        };
        DepthSnapshot {
            bids: self.bids.values().take(depth).map(aggregate).collect(),
            asks: self.asks.values().take(depth).map(aggregate).collect(),
        }
    }

    /// Levels on `side` from best to worst.
    pub fn levels(&self, side: OrderSide) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.bids.values()),
            OrderSide::Sell => Box::new(self.asks.values()),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn book() -> OrderBook {
        OrderBook::new(MarketPair::new("BTC", "USDT"))
    }

    fn make_order(side: OrderSide, price: i128, amount: i128, seq: u64) -> Order {
        let mut order = Order::dummy_limit(side, price, amount);
        order.sequence = seq;
        order.locked = match side {
            OrderSide::Buy => price * amount * 2,
            OrderSide::Sell => amount,
        };
        order
    }

    #[test]
    fn insert_and_query_best_bid_ask() {
        let mut book = book();
        book.insert(make_order(OrderSide::Buy, 100, 1, 1)).unwrap();
        book.insert(make_order(OrderSide::Buy, 99, 1, 2)).unwrap();
        book.insert(make_order(OrderSide::Sell, 101, 1, 3)).unwrap();
        book.insert(make_order(OrderSide::Sell, 102, 1, 4)).unwrap();

        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), Some(101));
        assert_eq!(book.spread(), Some(1));
        assert_eq!(book.mid_price(), Some(100));
        assert_eq!(book.order_count(), 4);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut book = book();
        let order = make_order(OrderSide::Buy, 100, 1, 1);
        let id = order.id;
        book.insert(order).unwrap();

        assert_eq!(book.cancel(&id).unwrap().id, id);
        assert!(book.cancel(&id).is_none());
        assert!(book.is_empty());
        assert_eq!(book.bid_depth(), 0);
    }

    #[test]
    fn duplicate_and_empty_orders_rejected() {
        let mut book = book();
        let order = make_order(OrderSide::Buy, 100, 1, 1);
        book.insert(order.clone()).unwrap();
        assert!(matches!(
            book.insert(order),
            Err(SpotmatchError::DuplicateOrder(_))
        ));

        let mut empty = make_order(OrderSide::Sell, 100, 1, 2);
        empty.remaining = 0;
        empty.filled = 1;
        assert!(matches!(
            book.insert(empty),
            Err(SpotmatchError::InvalidOrder { .. })
        ));

        let market = Order::dummy_market(OrderSide::Buy, 1);
        assert!(book.insert(market).is_err());
    }

    #[test]
    fn snapshot_aggregates_levels() {
        let mut book = book();
        book.insert(make_order(OrderSide::Buy, 90, 2, 1)).unwrap();
        book.insert(make_order(OrderSide::Buy, 100, 3, 2)).unwrap();
        book.insert(make_order(OrderSide::Buy, 100, 4, 3)).unwrap();
        book.insert(make_order(OrderSide::Sell, 110, 1, 4)).unwrap();
        book.insert(make_order(OrderSide::Sell, 105, 5, 5)).unwrap();

        let snap = book.snapshot(1);
        assert_eq!(snap.bids, vec![BookLevel { price: 100, amount: 7 }]);
        assert_eq!(snap.asks, vec![BookLevel { price: 105, amount: 5 }]);

        let full = book.snapshot(10);
        assert_eq!(full.bids.len(), 2);
        assert_eq!(full.asks[1].price, 110);
    }

    #[test]
    fn partial_fill_keeps_order_resting() {
        let mut book = book();
        let maker = make_order(OrderSide::Sell, 100, 5, 1);
        let id = maker.id;
        book.insert(maker).unwrap();

        let fill = book.apply_fill(&id, 2, 200, FeeRate::ZERO, 2).unwrap();
        assert!(!fill.removed);
        assert_eq!(fill.maker.remaining, 3);
        assert_eq!(book.get(&id).unwrap().remaining, 3);
        assert_eq!(book.snapshot(1).asks[0].amount, 3);

        let fill = book.apply_fill(&id, 3, 300, FeeRate::ZERO, 2).unwrap();
        assert!(fill.removed);
        assert_eq!(fill.maker.status, OrderStatus::Filled);
        assert!(!book.contains(&id));
        assert_eq!(book.ask_depth(), 0);
    }

    #[test]
    fn restore_and_replace_undo_fills() {
        let mut book = book();
        let first = make_order(OrderSide::Sell, 100, 1, 1);
        let second = make_order(OrderSide::Sell, 100, 1, 2);
        let (first_id, second_id) = (first.id, second.id);
        book.insert(first.clone()).unwrap();
        book.insert(second).unwrap();

        book.apply_fill(&first_id, 1, 100, FeeRate::ZERO, 2).unwrap();
        assert_eq!(book.front(OrderSide::Sell).unwrap().id, second_id);

        book.restore(first).unwrap();
        assert_eq!(book.front(OrderSide::Sell).unwrap().id, first_id);

        let before = book.get(&second_id).unwrap().clone();
        let mut partial = make_order(OrderSide::Sell, 100, 2, 3);
        let partial_id = partial.id;
        book.insert(partial.clone()).unwrap();
        book.apply_fill(&partial_id, 1, 100, FeeRate::ZERO, 2).unwrap();
        book.replace(partial).unwrap();
        assert_eq!(book.get(&partial_id).unwrap().remaining, 2);
        assert_eq!(book.get(&second_id).unwrap(), &before);
    }

    #[test]
    fn orders_for_user_filters_both_sides() {
        let mut book = book();
        let user = UserId::new();
        let mut mine = make_order(OrderSide::Buy, 90, 1, 1);
        mine.user_id = user;
        let mut mine_ask = make_order(OrderSide::Sell, 110, 1, 2);
        mine_ask.user_id = user;
        book.insert(mine).unwrap();
        book.insert(mine_ask).unwrap();
        book.insert(make_order(OrderSide::Buy, 95, 1, 3)).unwrap();

        assert_eq!(book.orders_for_user(user).len(), 2);
    }

    #[test]
    fn levels_iterate_best_first() {
        let mut book = book();
        for (seq, price) in [90, 100, 95].into_iter().enumerate() {
            book.insert(make_order(OrderSide::Buy, price, 1, seq as u64)).unwrap();
        }
        let prices: Vec<i128> = book.levels(OrderSide::Buy).map(|l| l.price).collect();
        assert_eq!(prices, vec![100, 95, 90]);
    }

    #[test]
    fn empty_book() {
        let book = book();
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.mid_price(), None);
        assert!(book.front(OrderSide::Buy).is_none());
    }

    proptest! {
        /// Whatever order orders are (re)inserted in, each level stays
        /// sorted by arrival sequence.
        #[test]
        fn levels_stay_in_arrival_order(
            entries in prop::collection::vec((0u64..1_000, 1i128..5), 1..40)
        ) {
            let mut book = book();
            let mut seen = std::collections::HashSet::new();
            for (seq, price) in entries {
                if !seen.insert(seq) {
                    continue;
                }
                book.insert(make_order(OrderSide::Sell, price, 1, seq)).unwrap();
            }
            for level in book.levels(OrderSide::Sell) {
                let seqs: Vec<u64> = level.orders.iter().map(|o| o.sequence).collect();
                let mut sorted = seqs.clone();
                sorted.sort_unstable();
                prop_assert_eq!(seqs, sorted);
                prop_assert!(level.orders.iter().all(|o| o.remaining > 0));
            }
        }
    }
}

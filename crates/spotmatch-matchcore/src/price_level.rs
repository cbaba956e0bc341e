//! A single price level in the order book.
//!
//! Orders at the same price are kept in arrival-sequence order (time
//! priority) in a [`VecDeque`].

use std::collections::VecDeque;

use spotmatch_types::{Order, OrderId};

/// All resting orders at one price.
///
/// The front of the deque has the lowest `sequence` and is filled first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price at this level, at the market's price precision.
    pub price: i128,
    /// Orders in time-priority order (front = oldest).
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: i128) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    /// Place an order at its arrival-sequence position.
    ///
    /// New arrivals always carry the highest sequence and land at the back;
    /// a restored order slots back in front of anything that arrived later.
    pub fn insert(&mut self, order: Order) {
        match self.orders.back() {
            Some(last) if last.sequence > order.sequence => {
                let pos = self
                    .orders
                    .partition_point(|o| o.sequence < order.sequence);
                self.orders.insert(pos, order);
            }
            _ => self.orders.push_back(order),
        }
    }

    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == *order_id)
    }

    pub fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == *order_id)
    }

    /// Total remaining amount across all orders at this level.
    #[must_use]
    pub fn total_remaining(&self) -> i128 {
        self.orders.iter().map(|o| o.remaining).sum()
    }

    /// Remove a specific order by ID.
    pub fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == *order_id)?;
        self.orders.remove(pos)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }
}

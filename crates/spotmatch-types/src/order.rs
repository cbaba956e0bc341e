//! Order types for the SpotMatch matching engine.
//!
//! All quantity fields are fixed-point integers: `amount`, `filled`,
//! `remaining` at the market's amount precision; `price`, `cost`, `fee` and
//! `locked` (for buys) at the price precision.
//!
//! Invariant: `filled + remaining == amount` for every order at all times.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::FEE_RATE_PRECISION;
use crate::fixed::{self, FeeRate, Rounding};
use crate::{OrderId, Result, SpotmatchError, UserId};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Lifecycle status of an order.
///
/// `OPEN → PARTIALLY_FILLED → {FILLED | CANCELLED | EXPIRED}` and
/// `OPEN → {CANCELLED | EXPIRED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    /// Terminal states never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled | Self::Expired)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Validated order parameters, before the engine assigns identity and
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub amount: i128,
    pub price: Option<i128>,
}

impl OrderRequest {
    /// Structural checks that do not need market configuration.
    pub fn validate_shape(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(SpotmatchError::InvalidOrder {
                reason: "amount must be positive".to_string(),
            });
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => Err(SpotmatchError::InvalidOrder {
                reason: "limit order requires a price".to_string(),
            }),
            (OrderType::Limit, Some(p)) if p <= 0 => Err(SpotmatchError::InvalidOrder {
                reason: "price must be positive".to_string(),
            }),
            (OrderType::Market, Some(_)) => Err(SpotmatchError::InvalidOrder {
                reason: "market order cannot carry a price".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Core order struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Limit price; `None` for market orders.
    pub price: Option<i128>,
    pub amount: i128,
    pub filled: i128,
    pub remaining: i128,
    /// Accumulated quote cost of all fills.
    pub cost: i128,
    /// Accumulated fee paid on all fills (quote currency).
    pub fee: i128,
    /// Unrounded fee accrued so far: `Σ cost × rate` at
    /// `price precision + FEE_RATE_PRECISION`. `fee` is this value rounded
    /// half-up, so per-fill rounding never compounds.
    pub fee_basis: i128,
    /// Funds still reserved for this order: quote for buys, base for sells.
    pub locked: i128,
    /// Per-symbol arrival sequence (time priority within a price level).
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create an OPEN order from a validated request.
    #[must_use]
    pub fn from_request(request: &OrderRequest, sequence: u64, locked: i128) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id: request.user_id,
            symbol: request.symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            status: OrderStatus::Open,
            price: request.price,
            amount: request.amount,
            filled: 0,
            remaining: request.amount,
            cost: 0,
            fee: 0,
            fee_basis: 0,
            locked,
            sequence,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// `filled + remaining == amount`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.filled.checked_add(self.remaining) == Some(self.amount)
            && self.filled >= 0
            && self.remaining >= 0
    }

    /// Whether this order would trade against a resting order at `price`.
    ///
    /// Market orders cross at any price.
    #[must_use]
    pub fn crosses(&self, price: i128) -> bool {
        match (self.order_type, self.side, self.price) {
            (OrderType::Market, _, _) => true,
            (OrderType::Limit, OrderSide::Buy, Some(limit)) => price <= limit,
            (OrderType::Limit, OrderSide::Sell, Some(limit)) => price >= limit,
            (OrderType::Limit, _, None) => false,
        }
    }

    /// Record a fill of `amount` costing `cost` at fee `rate`, consume the
    /// matching part of `locked`, and derive the status from
    /// `filled`/`remaining`.
    ///
    /// Returns the fee charged for this fill: the increase of the rounded
    /// cumulative fee, which is never negative.
    ///
    /// Buys consume `cost + fee` of quote from `locked`; sells consume
    /// `amount` of base.
    pub fn apply_fill(
        &mut self,
        amount: i128,
        cost: i128,
        rate: FeeRate,
        price_precision: u32,
    ) -> Result<i128> {
        if amount <= 0 || amount > self.remaining || cost < 0 {
            return Err(SpotmatchError::MatchingFailed {
                reason: format!(
                    "fill {amount} invalid for order {} with remaining {}",
                    self.id, self.remaining
                ),
            });
        }
        let fee_basis = fixed::add(
            self.fee_basis,
            cost.checked_mul(rate.raw()).ok_or(SpotmatchError::Overflow)?,
        )?;
        let total_fee = fixed::rescale(
            fee_basis,
            price_precision + FEE_RATE_PRECISION,
            price_precision,
            Rounding::HalfUp,
        )?;
        let fee = total_fee - self.fee;
        let consumed = match self.side {
            OrderSide::Buy => cost + fee,
            OrderSide::Sell => amount,
        };
        if consumed > self.locked {
            return Err(SpotmatchError::InsufficientLocked {
                currency: self.symbol.clone(),
            });
        }

        self.filled += amount;
        self.remaining -= amount;
        self.cost += cost;
        self.fee_basis = fee_basis;
        self.fee = total_fee;
        self.locked -= consumed;
        self.status = self.derived_status();
        self.updated_at = Utc::now();
        Ok(fee)
    }

    /// Status as a pure function of `filled` / `remaining`.
    #[must_use]
    pub fn derived_status(&self) -> OrderStatus {
        if self.remaining == 0 {
            OrderStatus::Filled
        } else if self.filled > 0 {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Open
        }
    }

    /// Explicit cancel. The remaining amount is released, `filled` is kept.
    pub fn cancel(&mut self) -> Result<()> {
        self.finish(OrderStatus::Cancelled)
    }

    /// Explicit expiry.
    pub fn expire(&mut self) -> Result<()> {
        self.finish(OrderStatus::Expired)
    }

    fn finish(&mut self, status: OrderStatus) -> Result<()> {
        match self.status {
            OrderStatus::Filled => Err(SpotmatchError::OrderAlreadyFilled(self.id)),
            s if s.is_terminal() => Err(SpotmatchError::OrderNotFound(self.id)),
            _ => {
                self.status = status;
                self.updated_at = Utc::now();
                Ok(())
            }
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// A resting BTC/USDT limit order with nothing locked.
    pub fn dummy_limit(side: OrderSide, price: i128, amount: i128) -> Self {
        Self::dummy_limit_for_user(UserId::new(), side, price, amount)
    }

    pub fn dummy_limit_for_user(user_id: UserId, side: OrderSide, price: i128, amount: i128) -> Self {
        let request = OrderRequest {
            user_id,
            symbol: "BTC/USDT".to_string(),
            side,
            order_type: OrderType::Limit,
            amount,
            price: Some(price),
        };
        Self::from_request(&request, 0, 0)
    }

    pub fn dummy_market(side: OrderSide, amount: i128) -> Self {
        let request = OrderRequest {
            user_id: UserId::new(),
            symbol: "BTC/USDT".to_string(),
            side,
            order_type: OrderType::Market,
            amount,
            price: None,
        };
        Self::from_request(&request, 0, 0)
    }
}

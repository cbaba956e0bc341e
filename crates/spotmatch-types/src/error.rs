//! Error types for the SpotMatch matching engine.
//!
//! All errors use the `SM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by category:
//! - 1xx: Validation errors (rejected before any mutation)
//! - 2xx: Resource errors (surfaced to the caller, never retried)
//! - 3xx: Matching errors
//! - 4xx: Settlement / storage errors
//! - 5xx: Market data errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{OrderId, TradeId};

/// Central error enum for all SpotMatch operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpotmatchError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// The decimal input has more fractional digits than the market allows.
    #[error("SM_ERR_100: Precision exceeded: {value} has more than {precision} fractional digits")]
    PrecisionExceeded { value: String, precision: u32 },

    /// The input could not be parsed as a non-negative decimal number.
    #[error("SM_ERR_101: Invalid number: {0}")]
    InvalidNumber(String),

    /// Amount, price or cost falls outside the market's configured limits.
    #[error("SM_ERR_102: Invalid limits: {reason}")]
    InvalidLimits { reason: String },

    /// The market exists but is not accepting orders.
    #[error("SM_ERR_103: Market disabled: {0}")]
    MarketDisabled(String),

    /// No market is configured for this symbol.
    #[error("SM_ERR_104: Market not found: {0}")]
    MarketNotFound(String),

    /// The order failed structural validation.
    #[error("SM_ERR_105: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    // =================================================================
    // Resource Errors (2xx)
    // =================================================================
    /// Not enough available balance to lock for the order.
    #[error("SM_ERR_200: Insufficient balance in {currency}: need {needed}, have {available}")]
    InsufficientBalance {
        currency: String,
        needed: i128,
        available: i128,
    },

    /// The order is not resting in the book (or belongs to another user).
    #[error("SM_ERR_201: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order was fully filled and can no longer be cancelled.
    #[error("SM_ERR_202: Order already filled: {0}")]
    OrderAlreadyFilled(OrderId),

    /// An order with this ID already exists.
    #[error("SM_ERR_203: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// Not enough locked (in-order) balance to settle or release.
    #[error("SM_ERR_204: Insufficient locked balance in {currency}")]
    InsufficientLocked { currency: String },

    // =================================================================
    // Matching Errors (3xx)
    // =================================================================
    /// A fixed-point operation overflowed the integer representation.
    #[error("SM_ERR_300: Arithmetic overflow")]
    Overflow,

    /// Division by a zero fixed-point value.
    #[error("SM_ERR_301: Division by zero")]
    DivisionByZero,

    /// The matching walk reached an inconsistent state.
    #[error("SM_ERR_302: Matching failed: {reason}")]
    MatchingFailed { reason: String },

    // =================================================================
    // Settlement Errors (4xx)
    // =================================================================
    /// Durable storage rejected a write. Transient: retried by the settler.
    #[error("SM_ERR_400: Storage error: {0}")]
    Storage(String),

    /// Settlement retries were exhausted; the match was rolled back.
    #[error("SM_ERR_401: Settlement failed for order {order_id}: {reason}")]
    SettlementFailed { order_id: OrderId, reason: String },

    /// A trade has already been settled (idempotency guard).
    #[error("SM_ERR_402: Trade already settled: {0}")]
    TradeAlreadySettled(TradeId),

    /// Supply conservation invariant violated.
    #[error("SM_ERR_403: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Market Data Errors (5xx)
    // =================================================================
    /// A market-data fetch for one stream failed.
    #[error("SM_ERR_500: Market data fetch failed: {0}")]
    FetchFailed(String),

    /// Unknown candle interval.
    #[error("SM_ERR_501: Unknown interval: {0}")]
    UnknownInterval(String),

    /// Unknown subscription stream type.
    #[error("SM_ERR_502: Unknown stream: {0}")]
    UnknownStream(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// The per-symbol engine task is no longer running.
    #[error("SM_ERR_901: Engine unavailable for {0}")]
    EngineUnavailable(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("SM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl SpotmatchError {
    /// Short stable code, e.g. `"SM_ERR_201"`, used in wire error bodies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrecisionExceeded { .. } => "SM_ERR_100",
            Self::InvalidNumber(_) => "SM_ERR_101",
            Self::InvalidLimits { .. } => "SM_ERR_102",
            Self::MarketDisabled(_) => "SM_ERR_103",
            Self::MarketNotFound(_) => "SM_ERR_104",
            Self::InvalidOrder { .. } => "SM_ERR_105",
            Self::InsufficientBalance { .. } => "SM_ERR_200",
            Self::OrderNotFound(_) => "SM_ERR_201",
            Self::OrderAlreadyFilled(_) => "SM_ERR_202",
            Self::DuplicateOrder(_) => "SM_ERR_203",
            Self::InsufficientLocked { .. } => "SM_ERR_204",
            Self::Overflow => "SM_ERR_300",
            Self::DivisionByZero => "SM_ERR_301",
            Self::MatchingFailed { .. } => "SM_ERR_302",
            Self::Storage(_) => "SM_ERR_400",
            Self::SettlementFailed { .. } => "SM_ERR_401",
            Self::TradeAlreadySettled(_) => "SM_ERR_402",
            Self::SupplyInvariantViolation { .. } => "SM_ERR_403",
            Self::FetchFailed(_) => "SM_ERR_500",
            Self::UnknownInterval(_) => "SM_ERR_501",
            Self::UnknownStream(_) => "SM_ERR_502",
            Self::Internal(_) => "SM_ERR_900",
            Self::EngineUnavailable(_) => "SM_ERR_901",
            Self::Configuration(_) => "SM_ERR_902",
        }
    }

    /// Validation errors are rejected before any state is touched.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PrecisionExceeded { .. }
                | Self::InvalidNumber(_)
                | Self::InvalidLimits { .. }
                | Self::MarketDisabled(_)
                | Self::MarketNotFound(_)
                | Self::InvalidOrder { .. }
        )
    }

    /// Only storage failures are worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SpotmatchError>;

//! # spotmatch-matchcore
//!
//! **Order book and continuous matcher for SpotMatch.**
//!
//! MatchCore is the compute plane of one market. It has:
//!
//! - **No I/O**: no storage writes and no balance lookups; callers settle
//!   each [`Fill`] and can [`undo_fill`] it if settlement fails
//! - **Price-time priority**: best price first, then arrival sequence
//! - **Self-trade prevention**: a resting order of the same user is
//!   cancelled instead of matched
//! - **Deterministic output**: the same order stream yields the same trades
//!   and the same [`compute_trade_root`]

pub mod determinism;
pub mod matcher;
pub mod orderbook;
pub mod price_level;
pub mod reservation;

pub use determinism::{compute_trade_root, trade_root_hex, verify_trade_root};
pub use matcher::{Fill, MatchStep, next_match, undo_fill};
pub use orderbook::{BookFill, BookLevel, DepthSnapshot, OrderBook};
pub use price_level::PriceLevel;
pub use reservation::required_lock;

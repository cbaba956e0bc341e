//! # spotmatch-types
//!
//! Shared types, errors, and configuration for the **SpotMatch** matching engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Fixed-point layer**: [`fixed::to_integer`], [`fixed::to_decimal`], [`FeeRate`], [`Rounding`]
//! - **Identifiers**: [`OrderId`], [`UserId`], [`TradeId`], [`MarketPair`]
//! - **Market model**: [`MarketConfig`], [`MarketCatalog`], [`Precision`], [`Limits`], [`WalletType`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderType`], [`OrderStatus`]
//! - **Trade model**: [`Trade`]
//! - **Balance model**: [`BalanceEntry`], [`WalletKey`]
//! - **Candle model**: [`Candle`], [`CandleInterval`]
//! - **Configuration**: [`AppConfig`], [`EngineConfig`], [`FeedConfig`], [`ServerConfig`]
//! - **Errors**: [`SpotmatchError`] with `SM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod candle;
pub mod config;
pub mod constants;
pub mod error;
pub mod fixed;
pub mod ids;
pub mod market;
pub mod order;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use spotmatch_types::{Order, OrderSide, Trade, MarketConfig, ...};

pub use balance::*;
pub use candle::*;
pub use config::*;
pub use error::*;
pub use fixed::{FeeRate, Rounding};
pub use ids::*;
pub use market::*;
pub use order::*;
pub use trade::*;

// Constants are accessed via `spotmatch_types::constants::FOO`
// and fixed-point functions via `spotmatch_types::fixed::foo`
// (not re-exported to avoid name collisions).

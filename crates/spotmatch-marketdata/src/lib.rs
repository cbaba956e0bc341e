//! # spotmatch-marketdata
//!
//! Market data for SpotMatch:
//!
//! - [`MarketDataAggregator`]: rolling 24h ticker, OHLCV candles and recent
//!   trades per symbol, updated incrementally from settled trades
//! - [`CandleStore`]: where closed candles go
//! - [`Multiplexer`]: one broadcast loop per watched symbol, shared by all
//!   of its subscribers

pub mod aggregator;
pub mod candles;
pub mod multiplexer;
pub mod source;
pub mod ticker;
pub mod views;

pub use aggregator::MarketDataAggregator;
pub use candles::{CandleAggregator, CandleStore, MemoryCandleStore, with_open_bucket};
pub use multiplexer::{ClientId, ClientSender, Multiplexer, StreamKind, StreamMessage};
pub use source::MarketDataSource;
pub use ticker::{RollingTicker, TickerStats};
pub use views::{CandleView, DepthView, LevelView, TickerView, TradeView};

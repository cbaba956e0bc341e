//! What the multiplexer needs from the rest of the system.

use async_trait::async_trait;
use spotmatch_types::Result;

use crate::views::{DepthView, TickerView, TradeView};

/// Snapshot provider for the subscription multiplexer.
///
/// Implemented by the engine registry; each call reads the current state of
/// one symbol.
#[async_trait]
pub trait MarketDataSource: Send + Sync + 'static {
    /// Whether `symbol` is a configured, enabled market.
    async fn is_enabled(&self, symbol: &str) -> bool;

    async fn fetch_order_book(&self, symbol: &str, depth: usize) -> Result<DepthView>;

    /// Most recent trades, newest first.
    async fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeView>>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerView>;
}

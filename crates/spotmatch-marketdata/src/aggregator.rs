//! Per-symbol market data derived from the trade stream.

use std::collections::VecDeque;

use spotmatch_types::constants::RECENT_TRADES_LIMIT;
use spotmatch_types::{Candle, CandleInterval, Trade};

use crate::candles::CandleAggregator;
use crate::ticker::{RollingTicker, TickerStats};

/// Ticker, candles and recent trades of one symbol.
///
/// Owned by the symbol's engine task and fed every settled trade.
#[derive(Debug)]
pub struct MarketDataAggregator {
    symbol: String,
    ticker: RollingTicker,
    candles: CandleAggregator,
    recent: VecDeque<Trade>,
}

impl MarketDataAggregator {
    #[must_use]
    pub fn new(symbol: impl Into<String>, intervals: &[CandleInterval]) -> Self {
        let symbol = symbol.into();
        Self {
            candles: CandleAggregator::new(symbol.clone(), intervals),
            symbol,
            ticker: RollingTicker::default(),
            recent: VecDeque::with_capacity(RECENT_TRADES_LIMIT),
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Fold a settled trade in. Returns candles it closed.
    pub fn on_trade(&mut self, trade: &Trade) -> Vec<Candle> {
        let ts = trade.timestamp_ms();
        self.ticker.on_trade(ts, trade.price, trade.amount);
        if self.recent.len() == RECENT_TRADES_LIMIT {
            self.recent.pop_back();
        }
        self.recent.push_front(trade.clone());
        self.candles.on_trade(ts, trade.price, trade.amount)
    }

    /// Close candles whose interval ended by `now_ms`.
    pub fn roll(&mut self, now_ms: i64) -> Vec<Candle> {
        self.candles.roll(now_ms)
    }

    pub fn ticker(&mut self, now_ms: i64) -> TickerStats {
        self.ticker.stats(now_ms)
    }

    /// Newest first.
    pub fn recent_trades(&self) -> impl Iterator<Item = &Trade> {
        self.recent.iter()
    }

    #[must_use]
    pub fn open_candle(&self, interval: CandleInterval) -> Option<&Candle> {
        self.candles.open_candle(interval)
    }
}

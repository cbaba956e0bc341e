//! Wire representations. Every number is a decimal string at the market's
//! precision.

use serde::{Deserialize, Serialize};
use spotmatch_matchcore::DepthSnapshot;
use spotmatch_types::fixed::{self, Rounding};
use spotmatch_types::{Candle, CandleInterval, MarketConfig, OrderSide, Trade};

use crate::ticker::TickerStats;

/// `[price, amount]`.
pub type LevelView = [String; 2];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthView {
    pub symbol: String,
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
}

impl DepthView {
    #[must_use]
    pub fn from_snapshot(market: &MarketConfig, snapshot: &DepthSnapshot) -> Self {
        let level = |l: &spotmatch_matchcore::BookLevel| {
            [market.format_price(l.price), market.format_amount(l.amount)]
        };
        Self {
            symbol: market.symbol(),
            bids: snapshot.bids.iter().map(level).collect(),
            asks: snapshot.asks.iter().map(level).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerView {
    pub symbol: String,
    /// Last trade price; `None` before the first trade.
    pub price: Option<String>,
    pub change_24h: String,
    /// Percent change over the window, two decimals.
    pub change_percent_24h: String,
    pub high_24h: Option<String>,
    pub low_24h: Option<String>,
    pub volume_24h: String,
}

impl TickerView {
    #[must_use]
    pub fn from_stats(market: &MarketConfig, stats: &TickerStats) -> Self {
        let price = |v: Option<i128>| v.map(|p| market.format_price(p));
        let percent = stats
            .open
            .filter(|open| *open > 0)
            .and_then(|open| {
                let pp = market.precision.price;
                fixed::div(stats.change * 100, pp, open, pp, 2, Rounding::HalfUp).ok()
            })
            .unwrap_or(0);
        Self {
            symbol: market.symbol(),
            price: price(stats.last),
            change_24h: market.format_price(stats.change),
            change_percent_24h: fixed::to_decimal(percent, 2),
            high_24h: price(stats.high),
            low_24h: price(stats.low),
            volume_24h: market.format_amount(stats.volume),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeView {
    pub id: String,
    pub sequence: u64,
    pub price: String,
    pub amount: String,
    pub cost: String,
    /// Side of the taker.
    pub side: OrderSide,
    pub timestamp: i64,
}

impl TradeView {
    #[must_use]
    pub fn from_trade(market: &MarketConfig, trade: &Trade) -> Self {
        Self {
            id: trade.id.to_string(),
            sequence: trade.sequence,
            price: market.format_price(trade.price),
            amount: market.format_amount(trade.amount),
            cost: market.format_price(trade.cost),
            side: trade.taker_side,
            timestamp: trade.timestamp_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleView {
    pub interval: CandleInterval,
    pub open_time: i64,
    pub close_time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub trade_count: u64,
}

impl CandleView {
    #[must_use]
    pub fn from_candle(market: &MarketConfig, candle: &Candle) -> Self {
        Self {
            interval: candle.interval,
            open_time: candle.open_time,
            close_time: candle.close_time,
            open: market.format_price(candle.open),
            high: market.format_price(candle.high),
            low: market.format_price(candle.low),
            close: market.format_price(candle.close),
            volume: market.format_amount(candle.volume),
            trade_count: candle.trade_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use spotmatch_matchcore::BookLevel;

    use super::*;

    #[test]
    fn depth_uses_decimal_strings() {
        let market = MarketConfig::btc_usdt();
        let snapshot = DepthSnapshot {
            bids: vec![BookLevel { price: 5_000_000, amount: 50_000_000 }],
            asks: vec![],
        };
        let view = DepthView::from_snapshot(&market, &snapshot);
        assert_eq!(view.bids[0], ["50000.00".to_string(), "0.50000000".to_string()]);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["bids"][0][0], "50000.00");
    }

    #[test]
    fn ticker_percent_change() {
        let market = MarketConfig::btc_usdt();
        let stats = TickerStats {
            last: Some(9_000),
            open: Some(10_000),
            high: Some(10_000),
            low: Some(9_000),
            volume: 300_000_000,
            change: -1_000,
            trade_count: 2,
        };
        let view = TickerView::from_stats(&market, &stats);
        assert_eq!(view.price.as_deref(), Some("90.00"));
        assert_eq!(view.change_24h, "-10.00");
        assert_eq!(view.change_percent_24h, "-10.00");
        assert_eq!(view.volume_24h, "3.00000000");

        let empty = TickerView::from_stats(&market, &TickerStats::default());
        assert_eq!(empty.price, None);
        assert_eq!(empty.change_percent_24h, "0.00");
    }
}

//! Rolling 24h ticker.
//!
//! Trades enter a time-ordered window. High and low are tracked with
//! monotonic deques, so each trade and each eviction costs amortized O(1)
//! and the window is never rescanned.

use std::collections::VecDeque;

use spotmatch_types::constants::TICKER_WINDOW_MS;

#[derive(Debug, Clone, Copy)]
struct Sample {
    seq: u64,
    timestamp_ms: i64,
    price: i128,
    amount: i128,
}

/// Ticker figures at the market's precisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerStats {
    /// Last trade price, even if it left the window.
    pub last: Option<i128>,
    /// First price inside the window.
    pub open: Option<i128>,
    pub high: Option<i128>,
    pub low: Option<i128>,
    /// Base volume inside the window.
    pub volume: i128,
    /// `last - open`, zero when the window is empty.
    pub change: i128,
    pub trade_count: usize,
}

#[derive(Debug)]
pub struct RollingTicker {
    window_ms: i64,
    samples: VecDeque<Sample>,
    /// Decreasing prices; front is the window high.
    highs: VecDeque<(u64, i128)>,
    /// Increasing prices; front is the window low.
    lows: VecDeque<(u64, i128)>,
    volume: i128,
    last: Option<i128>,
    next_seq: u64,
}

impl Default for RollingTicker {
    fn default() -> Self {
        Self::new(TICKER_WINDOW_MS)
    }
}

impl RollingTicker {
    #[must_use]
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            samples: VecDeque::new(),
            highs: VecDeque::new(),
            lows: VecDeque::new(),
            volume: 0,
            last: None,
            next_seq: 0,
        }
    }

    pub fn on_trade(&mut self, timestamp_ms: i64, price: i128, amount: i128) {
        self.evict(timestamp_ms);
        let seq = self.next_seq;
        self.next_seq += 1;

        while self.highs.back().is_some_and(|&(_, p)| p <= price) {
            self.highs.pop_back();
        }
        self.highs.push_back((seq, price));
        while self.lows.back().is_some_and(|&(_, p)| p >= price) {
            self.lows.pop_back();
        }
        self.lows.push_back((seq, price));

        self.samples.push_back(Sample {
            seq,
            timestamp_ms,
            price,
            amount,
        });
        self.volume += amount;
        self.last = Some(price);
    }

    /// Drop samples at or before `now - window`.
    pub fn evict(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.window_ms;
        while let Some(sample) = self.samples.front().copied() {
            if sample.timestamp_ms > cutoff {
                break;
            }
            self.samples.pop_front();
            self.volume -= sample.amount;
            if self.highs.front().is_some_and(|&(seq, _)| seq == sample.seq) {
                self.highs.pop_front();
            }
            if self.lows.front().is_some_and(|&(seq, _)| seq == sample.seq) {
                self.lows.pop_front();
            }
        }
    }

    /// Figures for the window ending at `now_ms`.
    pub fn stats(&mut self, now_ms: i64) -> TickerStats {
        self.evict(now_ms);
        let open = self.samples.front().map(|s| s.price);
        let change = match (self.samples.back(), open) {
            (Some(last), Some(open)) => last.price - open,
            _ => 0,
        };
        TickerStats {
            last: self.last,
            open,
            high: self.highs.front().map(|&(_, p)| p),
            low: self.lows.front().map(|&(_, p)| p),
            volume: self.volume,
            change,
            trade_count: self.samples.len(),
        }
    }
}

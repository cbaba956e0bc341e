//! OHLCV candle aggregation.
//!
//! One open bucket per interval lives in memory. A bucket closes when a
//! trade or a [`CandleAggregator::roll`] moves past its `close_time`; closed
//! buckets are handed back to the caller for a [`CandleStore`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use spotmatch_types::{Candle, CandleInterval, Result};

/// Builds candles for every configured interval of one symbol.
#[derive(Debug)]
pub struct CandleAggregator {
    symbol: String,
    intervals: Vec<CandleInterval>,
    open: HashMap<CandleInterval, Candle>,
}

impl CandleAggregator {
    #[must_use]
    pub fn new(symbol: impl Into<String>, intervals: &[CandleInterval]) -> Self {
        let mut intervals = intervals.to_vec();
        intervals.sort_unstable();
        intervals.dedup();
        Self {
            symbol: symbol.into(),
            intervals,
            open: HashMap::new(),
        }
    }

    #[must_use]
    pub fn intervals(&self) -> &[CandleInterval] {
        &self.intervals
    }

    /// Fold a trade into every interval. Returns buckets the trade closed.
    pub fn on_trade(&mut self, timestamp_ms: i64, price: i128, amount: i128) -> Vec<Candle> {
        let mut closed = Vec::new();
        for &interval in &self.intervals {
            match self.open.get_mut(&interval) {
                Some(candle) if timestamp_ms <= candle.close_time => candle.update(price, amount),
                Some(candle) => {
                    let next = Candle::open_with(&self.symbol, interval, timestamp_ms, price, amount);
                    closed.push(std::mem::replace(candle, next));
                }
                None => {
                    let next = Candle::open_with(&self.symbol, interval, timestamp_ms, price, amount);
                    self.open.insert(interval, next);
                }
            }
        }
        closed
    }

    /// Close every bucket whose time is over at `now_ms`.
    pub fn roll(&mut self, now_ms: i64) -> Vec<Candle> {
        let expired: Vec<CandleInterval> = self
            .open
            .iter()
            .filter(|(_, c)| now_ms > c.close_time)
            .map(|(i, _)| *i)
            .collect();
        let mut closed: Vec<Candle> = expired
            .into_iter()
            .filter_map(|interval| self.open.remove(&interval))
            .collect();
        closed.sort_by_key(|c| c.interval);
        closed
    }

    /// The bucket currently being built for `interval`.
    #[must_use]
    pub fn open_candle(&self, interval: CandleInterval) -> Option<&Candle> {
        self.open.get(&interval)
    }
}

/// Closed candles in `[from, to]` plus the open bucket when it overlaps the
/// range, ordered by `open_time`.
#[must_use]
pub fn with_open_bucket(
    mut closed: Vec<Candle>,
    open: Option<&Candle>,
    from: i64,
    to: i64,
) -> Vec<Candle> {
    if let Some(open) = open {
        let overlaps = open.open_time <= to && open.close_time >= from;
        if overlaps && closed.iter().all(|c| c.open_time != open.open_time) {
            closed.push(open.clone());
        }
    }
    closed.sort_by_key(|c| c.open_time);
    closed
}

/// Durable home of closed candles.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Store a closed bucket. Storing the same bucket twice overwrites it.
    async fn append(&self, candle: &Candle) -> Result<()>;

    /// Closed buckets of `symbol`/`interval` overlapping `[from, to]`.
    async fn range(
        &self,
        symbol: &str,
        interval: CandleInterval,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>>;
}

/// [`CandleStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCandleStore {
    candles: Mutex<HashMap<(String, CandleInterval), BTreeMap<i64, Candle>>>,
}

impl MemoryCandleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandleStore for MemoryCandleStore {
    async fn append(&self, candle: &Candle) -> Result<()> {
        let mut candles = self.candles.lock().unwrap_or_else(PoisonError::into_inner);
        candles
            .entry((candle.symbol.clone(), candle.interval))
            .or_default()
            .insert(candle.open_time, candle.clone());
        Ok(())
    }

    async fn range(
        &self,
        symbol: &str,
        interval: CandleInterval,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>> {
        if from > to {
            return Ok(Vec::new());
        }
        let candles = self.candles.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(series) = candles.get(&(symbol.to_string(), interval)) else {
            return Ok(Vec::new());
        };
        // A bucket that opened before `from` may still reach into the range.
        let start = interval.align(from);
        Ok(series
            .range(start..=to)
            .map(|(_, c)| c.clone())
            .filter(|c| c.close_time >= from)
            .collect())
    }
}

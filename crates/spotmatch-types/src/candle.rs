//! OHLCV candle types.
//!
//! Candle boundaries are aligned to the UNIX epoch (a 1m candle opens on a
//! minute boundary). Prices are at the market's price precision, volume at
//! the amount precision.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SpotmatchError;

/// Supported candle intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CandleInterval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl CandleInterval {
    /// Duration of this interval in milliseconds.
    #[must_use]
    pub fn duration_ms(self) -> i64 {
        match self {
            Self::M1 => 60_000,
            Self::M5 => 5 * 60_000,
            Self::M15 => 15 * 60_000,
            Self::H1 => 3_600_000,
            Self::H4 => 4 * 3_600_000,
            Self::D1 => 86_400_000,
        }
    }

    /// All supported intervals, shortest first.
    #[must_use]
    pub fn all() -> &'static [CandleInterval] {
        &[
            Self::M1,
            Self::M5,
            Self::M15,
            Self::H1,
            Self::H4,
            Self::D1,
        ]
    }

    /// Floor a timestamp to this interval's boundary.
    #[must_use]
    pub fn align(self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.duration_ms()) * self.duration_ms()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }
}

impl fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandleInterval {
    type Err = SpotmatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| SpotmatchError::UnknownInterval(s.to_string()))
    }
}

/// A single OHLCV bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub interval: CandleInterval,
    /// Inclusive start, ms since epoch.
    pub open_time: i64,
    /// Inclusive end, ms since epoch (`open_time + duration - 1`).
    pub close_time: i64,
    pub open: i128,
    pub high: i128,
    pub low: i128,
    pub close: i128,
    pub volume: i128,
    pub trade_count: u64,
}

impl Candle {
    /// Open a bucket with its first trade.
    #[must_use]
    pub fn open_with(
        symbol: &str,
        interval: CandleInterval,
        timestamp_ms: i64,
        price: i128,
        amount: i128,
    ) -> Self {
        let open_time = interval.align(timestamp_ms);
        Self {
            symbol: symbol.to_string(),
            interval,
            open_time,
            close_time: open_time + interval.duration_ms() - 1,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: amount,
            trade_count: 1,
        }
    }

    /// Fold one more trade into the bucket.
    pub fn update(&mut self, price: i128, amount: i128) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += amount;
        self.trade_count += 1;
    }

    /// Whether `timestamp_ms` falls inside this bucket.
    #[must_use]
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        (self.open_time..=self.close_time).contains(&timestamp_ms)
    }

    /// OHLC invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0
            && self.close_time > self.open_time
    }
}

//! Configuration types for SpotMatch nodes, engines and feeds.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CandleInterval, MarketConfig, constants};

/// Top-level configuration loaded by the gateway binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    /// Markets traded by this node.
    #[serde(default = "default_markets")]
    pub markets: Vec<MarketConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            feed: FeedConfig::default(),
            markets: default_markets(),
        }
    }
}

fn default_markets() -> Vec<MarketConfig> {
    vec![MarketConfig::btc_usdt()]
}

/// HTTP/WS listener and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on for the REST/WS API.
    pub listen_addr: SocketAddr,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines instead of the human format.
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], constants::DEFAULT_API_PORT)),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Per-symbol matching engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per match before the settlement is rolled back.
    pub settlement_retries: u32,
    /// Delay between settlement attempts.
    pub retry_backoff_ms: u64,
    /// Capacity of each engine's command channel.
    pub command_buffer: usize,
    /// Candle intervals maintained per symbol.
    pub candle_intervals: Vec<CandleInterval>,
    /// Number of settled trade IDs remembered for idempotency.
    pub idempotency_cache_size: usize,
}

impl EngineConfig {
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settlement_retries: constants::DEFAULT_SETTLEMENT_RETRIES,
            retry_backoff_ms: constants::DEFAULT_RETRY_BACKOFF_MS,
            command_buffer: constants::DEFAULT_COMMAND_BUFFER,
            candle_intervals: CandleInterval::all().to_vec(),
            idempotency_cache_size: constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE,
        }
    }
}

/// Subscription multiplexer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Period of the per-symbol broadcast loop.
    pub broadcast_interval_ms: u64,
    /// Order-book depth pushed on the `orderbook` stream.
    pub default_depth: usize,
}

impl FeedConfig {
    #[must_use]
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: constants::DEFAULT_BROADCAST_INTERVAL_MS,
            default_depth: constants::DEFAULT_BOOK_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.listen_addr.port(), 8080);
        assert_eq!(cfg.engine.settlement_retries, 3);
        assert_eq!(cfg.feed.broadcast_interval(), Duration::from_millis(500));
        assert_eq!(cfg.markets.len(), 1);
        assert_eq!(cfg.engine.candle_intervals.len(), CandleInterval::all().len());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"engine":{"settlement_retries":5}}"#).unwrap();
        assert_eq!(cfg.engine.settlement_retries, 5);
        assert_eq!(cfg.engine.retry_backoff_ms, 25);
        assert_eq!(cfg.markets[0].symbol(), "BTC/USDT");
    }
}

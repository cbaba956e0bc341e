//! System-wide constants for the SpotMatch matching engine.

/// Maximum fractional digits any market precision may use.
pub const MAX_PRECISION: u32 = 18;

/// Fractional digits used to scale fee rates (`0.001` = `100_000`).
pub const FEE_RATE_PRECISION: u32 = 8;

/// Default order-book depth returned when the caller does not ask for one.
pub const DEFAULT_BOOK_DEPTH: usize = 50;

/// Default broadcast period of the subscription multiplexer.
pub const DEFAULT_BROADCAST_INTERVAL_MS: u64 = 500;

/// Default number of settlement attempts before a match is rolled back.
pub const DEFAULT_SETTLEMENT_RETRIES: u32 = 3;

/// Default backoff between settlement attempts.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 25;

/// Capacity of each per-symbol engine command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// Settlement idempotency cache size (number of trade IDs to remember).
pub const SETTLEMENT_IDEMPOTENCY_CACHE_SIZE: usize = 500_000;

/// Number of recent trades kept per symbol for the `trades` stream.
pub const RECENT_TRADES_LIMIT: usize = 50;

/// Rolling ticker window in milliseconds (24 hours).
pub const TICKER_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// How often the engine closes candle buckets that saw no trades.
pub const CANDLE_ROLL_INTERVAL_MS: u64 = 1000;

/// Default API port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "SpotMatch";

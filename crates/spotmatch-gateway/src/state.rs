use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use spotmatch_engine::EngineRegistry;
use spotmatch_ledger::MemoryLedger;
use spotmatch_marketdata::{ClientId, MemoryCandleStore, Multiplexer};
use spotmatch_types::{AppConfig, MarketCatalog, Result};

/// Shared handles given to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<EngineRegistry>,
    pub feed: Arc<Multiplexer<EngineRegistry>>,
    pub default_depth: usize,
    next_client: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: Arc<EngineRegistry>, feed: Multiplexer<EngineRegistry>, default_depth: usize) -> Self {
        Self {
            registry,
            feed: Arc::new(feed),
            default_depth,
            next_client: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Start engines over in-memory storage.
    pub async fn in_memory(config: &AppConfig) -> Result<Self> {
        let catalog = MarketCatalog::new(config.markets.clone())?;
        let registry = Arc::new(
            EngineRegistry::start(
                catalog,
                Arc::new(MemoryLedger::new()),
                Arc::new(MemoryCandleStore::new()),
                &config.engine,
            )
            .await?,
        );
        let feed = Multiplexer::new(Arc::clone(&registry), &config.feed);
        Ok(Self::new(registry, feed, config.feed.default_depth))
    }

    pub fn next_client_id(&self) -> ClientId {
        self.next_client.fetch_add(1, Ordering::Relaxed)
    }
}

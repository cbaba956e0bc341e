//! Settlement driver: idempotency plus bounded retry around a
//! [`LedgerStore`].
//!
//! Only transient (storage) errors are retried. When the attempts run out
//! the caller gets [`SpotmatchError::SettlementFailed`] and is expected to
//! undo the match in memory.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use spotmatch_types::{EngineConfig, Order, Result, SpotmatchError, WalletKey};
use tracing::{info, warn};

use crate::idempotency::SettledTrades;
use crate::store::{LedgerStore, MatchCommit};

/// Settles matches for one engine.
pub struct Settler {
    store: Arc<dyn LedgerStore>,
    settled: SettledTrades,
    attempts: u32,
    backoff: Duration,
}

impl Settler {
    #[must_use]
    pub fn new(store: Arc<dyn LedgerStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            settled: SettledTrades::with_capacity(config.idempotency_cache_size),
            attempts: config.settlement_retries.max(1),
            backoff: config.retry_backoff(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Commit one match.
    ///
    /// A store reporting the trade as already settled (an earlier attempt
    /// that failed after writing) counts as success.
    pub async fn settle(&mut self, commit: &MatchCommit) -> Result<()> {
        let trade_id = commit.trade.id;
        if self.settled.contains(&trade_id) {
            return Err(SpotmatchError::TradeAlreadySettled(trade_id));
        }

        let store = Arc::clone(&self.store);
        let outcome = retry(self.attempts, self.backoff, "commit_match", || {
            store.commit_match(commit)
        })
        .await;

        match outcome {
            Ok(()) => {}
            Err(SpotmatchError::TradeAlreadySettled(_)) => {
                info!(%trade_id, "trade was already committed by an earlier attempt");
            }
            Err(e) => {
                return Err(SpotmatchError::SettlementFailed {
                    order_id: commit.taker.id,
                    reason: e.to_string(),
                });
            }
        }
        self.settled.record(trade_id)
    }

    /// Persist a finished order and release its reservation, with retry.
    pub async fn finish(&self, order: &Order, release: &WalletKey) -> Result<()> {
        let store = Arc::clone(&self.store);
        retry(self.attempts, self.backoff, "finish_order", || {
            store.finish_order(order, release)
        })
        .await
    }

    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }
}

async fn retry<T, F, Fut>(attempts: u32, backoff: Duration, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(op = what, attempt, error = %e, "transient ledger error, retrying");
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

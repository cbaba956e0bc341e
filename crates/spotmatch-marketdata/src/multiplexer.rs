//! Per-symbol subscription multiplexer.
//!
//! However many clients watch a symbol, one task per symbol fetches each
//! subscribed stream once per broadcast tick and fans the result out:
//!
//! ```text
//! subscribe(client, kind, symbol) ──► SymbolFeed { subscribers[kind] }
//!                                          │
//!                   interval tick ─► fetch active kinds (join_all)
//!                                          │
//!                                  send to every subscriber of kind
//! ```
//!
//! The task starts with the first subscription to a symbol and is aborted
//! when the last one goes away. A new subscription also gets an immediate
//! snapshot of its stream.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use spotmatch_types::{FeedConfig, Result, SpotmatchError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::source::MarketDataSource;

/// Connection-scoped subscriber identifier.
pub type ClientId = u64;

/// Channel a client's stream messages are pushed to.
pub type ClientSender = mpsc::UnboundedSender<StreamMessage>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    #[serde(rename = "orderbook")]
    OrderBook,
    Trades,
    Ticker,
}

impl StreamKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderBook => "orderbook",
            Self::Trades => "trades",
            Self::Ticker => "ticker",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamKind {
    type Err = SpotmatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "orderbook" => Ok(Self::OrderBook),
            "trades" => Ok(Self::Trades),
            "ticker" => Ok(Self::Ticker),
            other => Err(SpotmatchError::UnknownStream(other.to_string())),
        }
    }
}

/// One push to a client: `{stream, symbol, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub stream: StreamKind,
    pub symbol: String,
    pub data: serde_json::Value,
}

struct SymbolFeed {
    subscribers: HashMap<StreamKind, HashMap<ClientId, ClientSender>>,
    task: JoinHandle<()>,
}

impl SymbolFeed {
    fn active_kinds(&self) -> Vec<StreamKind> {
        let mut kinds: Vec<StreamKind> = self
            .subscribers
            .iter()
            .filter(|(_, clients)| !clients.is_empty())
            .map(|(kind, _)| *kind)
            .collect();
        kinds.sort_unstable();
        kinds
    }

    fn is_idle(&self) -> bool {
        self.subscribers.values().all(HashMap::is_empty)
    }
}

type Feeds = Arc<Mutex<HashMap<String, SymbolFeed>>>;

fn lock(feeds: &Feeds) -> MutexGuard<'_, HashMap<String, SymbolFeed>> {
    feeds.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fan-out of market data streams to many clients.
pub struct Multiplexer<S: MarketDataSource> {
    source: Arc<S>,
    period: Duration,
    depth: usize,
    feeds: Feeds,
}

impl<S: MarketDataSource> Multiplexer<S> {
    #[must_use]
    pub fn new(source: Arc<S>, config: &FeedConfig) -> Self {
        Self {
            source,
            period: config.broadcast_interval().max(Duration::from_millis(1)),
            depth: config.default_depth,
            feeds: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe `client` to `kind` on `symbol`.
    ///
    /// Returns `false` (and logs) when the symbol is unknown or disabled.
    /// Otherwise the client first receives a snapshot of the stream, then
    /// every broadcast tick.
    pub async fn subscribe(
        &self,
        client: ClientId,
        kind: StreamKind,
        symbol: &str,
        sender: ClientSender,
    ) -> bool {
        let running = lock(&self.feeds).contains_key(symbol);
        if !running && !self.source.is_enabled(symbol).await {
            warn!(%symbol, %kind, client, "subscription to unknown or disabled market ignored");
            return false;
        }

        match fetch(self.source.as_ref(), symbol, kind, self.depth).await {
            Ok(message) => {
                let _ = sender.send(message);
            }
            Err(e) => warn!(%symbol, %kind, error = %e, "initial snapshot failed"),
        }

        let mut feeds = lock(&self.feeds);
        let feed = feeds.entry(symbol.to_string()).or_insert_with(|| {
            info!(%symbol, period_ms = self.period.as_millis() as u64, "starting feed");
            SymbolFeed {
                subscribers: HashMap::new(),
                task: tokio::spawn(run_feed(
                    Arc::clone(&self.source),
                    Arc::clone(&self.feeds),
                    symbol.to_string(),
                    self.period,
                    self.depth,
                )),
            }
        });
        feed.subscribers
            .entry(kind)
            .or_default()
            .insert(client, sender);
        debug!(%symbol, %kind, client, "subscribed");
        true
    }

    /// Remove one subscription. Stops the symbol's feed when it was the last.
    pub fn unsubscribe(&self, client: ClientId, kind: StreamKind, symbol: &str) {
        let mut feeds = lock(&self.feeds);
        if let Some(feed) = feeds.get_mut(symbol) {
            if let Some(clients) = feed.subscribers.get_mut(&kind) {
                clients.remove(&client);
            }
            if feed.is_idle() {
                stop_feed(&mut feeds, symbol);
            }
        }
    }

    /// Remove every subscription of `client`.
    pub fn disconnect(&self, client: ClientId) {
        let mut feeds = lock(&self.feeds);
        let mut idle = Vec::new();
        for (symbol, feed) in feeds.iter_mut() {
            for clients in feed.subscribers.values_mut() {
                clients.remove(&client);
            }
            if feed.is_idle() {
                idle.push(symbol.clone());
            }
        }
        for symbol in idle {
            stop_feed(&mut feeds, &symbol);
        }
    }

    /// Symbols with a running feed.
    #[must_use]
    pub fn active_symbols(&self) -> HashSet<String> {
        lock(&self.feeds).keys().cloned().collect()
    }

    #[must_use]
    pub fn subscriber_count(&self, symbol: &str, kind: StreamKind) -> usize {
        lock(&self.feeds)
            .get(symbol)
            .and_then(|feed| feed.subscribers.get(&kind))
            .map_or(0, HashMap::len)
    }
}

impl<S: MarketDataSource> Drop for Multiplexer<S> {
    fn drop(&mut self) {
        for (_, feed) in lock(&self.feeds).drain() {
            feed.task.abort();
        }
    }
}

fn stop_feed(feeds: &mut HashMap<String, SymbolFeed>, symbol: &str) {
    if let Some(feed) = feeds.remove(symbol) {
        feed.task.abort();
        info!(%symbol, "feed stopped, no subscribers left");
    }
}

async fn fetch<S: MarketDataSource + ?Sized>(
    source: &S,
    symbol: &str,
    kind: StreamKind,
    depth: usize,
) -> Result<StreamMessage> {
    let data = match kind {
        StreamKind::OrderBook => to_value(source.fetch_order_book(symbol, depth).await?)?,
        StreamKind::Trades => to_value(source.fetch_trades(symbol).await?)?,
        StreamKind::Ticker => to_value(source.fetch_ticker(symbol).await?)?,
    };
    Ok(StreamMessage {
        stream: kind,
        symbol: symbol.to_string(),
        data,
    })
}

fn to_value<T: Serialize>(value: T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| SpotmatchError::FetchFailed(e.to_string()))
}

async fn run_feed<S: MarketDataSource>(
    source: Arc<S>,
    feeds: Feeds,
    symbol: String,
    period: Duration,
    depth: usize,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;

        let kinds = {
            let guard = lock(&feeds);
            match guard.get(&symbol) {
                Some(feed) => feed.active_kinds(),
                None => return,
            }
        };
        let results = join_all(
            kinds
                .iter()
                .map(|kind| fetch(source.as_ref(), &symbol, *kind, depth)),
        )
        .await;

        if !broadcast(&feeds, &symbol, kinds, results) {
            return;
        }
    }
}

/// Push one tick's results to subscribers. Returns `false` once the feed is
/// gone or has no subscribers left.
fn broadcast(
    feeds: &Feeds,
    symbol: &str,
    kinds: Vec<StreamKind>,
    results: Vec<Result<StreamMessage>>,
) -> bool {
    let mut guard = lock(feeds);
    let Some(feed) = guard.get_mut(symbol) else {
        return false;
    };
    for (kind, result) in kinds.into_iter().zip(results) {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                warn!(%symbol, %kind, error = %e, "fetch failed, skipping this tick");
                continue;
            }
        };
        if let Some(clients) = feed.subscribers.get_mut(&kind) {
            clients.retain(|_, sender| sender.send(message.clone()).is_ok());
        }
    }
    if feed.is_idle() {
        guard.remove(symbol);
        info!(%symbol, "feed stopped, all subscribers gone");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_kind_wire_names() {
        assert_eq!(serde_json::to_string(&StreamKind::OrderBook).unwrap(), "\"orderbook\"");
        assert_eq!("ticker".parse::<StreamKind>().unwrap(), StreamKind::Ticker);
        assert_eq!(
            "candles".parse::<StreamKind>().unwrap_err(),
            SpotmatchError::UnknownStream("candles".into())
        );
    }
}

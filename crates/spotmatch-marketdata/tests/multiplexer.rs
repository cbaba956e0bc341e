//! Subscription multiplexer behaviour under tokio's paused clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use spotmatch_marketdata::{
    DepthView, MarketDataSource, Multiplexer, StreamKind, StreamMessage, TickerView, TradeView,
};
use spotmatch_types::{FeedConfig, Result, SpotmatchError};
use tokio::sync::mpsc;

#[derive(Default)]
struct CountingSource {
    ticker_fetches: AtomicUsize,
    book_fetches: AtomicUsize,
    fail_book: bool,
}

#[async_trait]
impl MarketDataSource for CountingSource {
    async fn is_enabled(&self, symbol: &str) -> bool {
        symbol == "BTC/USDT"
    }

    async fn fetch_order_book(&self, symbol: &str, _depth: usize) -> Result<DepthView> {
        self.book_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_book {
            return Err(SpotmatchError::FetchFailed("book unavailable".into()));
        }
        Ok(DepthView {
            symbol: symbol.to_string(),
            bids: vec![],
            asks: vec![["50000.00".into(), "0.10000000".into()]],
        })
    }

    async fn fetch_trades(&self, _symbol: &str) -> Result<Vec<TradeView>> {
        Ok(vec![])
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerView> {
        let n = self.ticker_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(TickerView {
            symbol: symbol.to_string(),
            price: Some(format!("{}.00", 50_000 + n)),
            change_24h: "0.00".into(),
            change_percent_24h: "0.00".into(),
            high_24h: None,
            low_24h: None,
            volume_24h: "0.00000000".into(),
        })
    }
}

fn config() -> FeedConfig {
    FeedConfig {
        broadcast_interval_ms: 500,
        default_depth: 10,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<StreamMessage>) -> Vec<StreamMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn one_fetch_per_tick_shared_by_all_subscribers() {
    let source = Arc::new(CountingSource::default());
    let mux = Multiplexer::new(Arc::clone(&source), &config());

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let (tx2, mut rx2) = mpsc::unbounded_channel();
    assert!(mux.subscribe(1, StreamKind::OrderBook, "BTC/USDT", tx1).await);
    assert!(mux.subscribe(2, StreamKind::OrderBook, "BTC/USDT", tx2).await);
    assert_eq!(mux.subscriber_count("BTC/USDT", StreamKind::OrderBook), 2);

    tokio::time::sleep(Duration::from_millis(1250)).await;

    // Two immediate snapshots plus one shared fetch at 500ms and 1000ms.
    assert_eq!(source.book_fetches.load(Ordering::SeqCst), 4);
    let got1 = drain(&mut rx1);
    let got2 = drain(&mut rx2);
    assert_eq!(got1.len(), 3);
    assert_eq!(got2.len(), 3);
    assert!(got1.iter().all(|m| m.stream == StreamKind::OrderBook && m.symbol == "BTC/USDT"));
    assert_eq!(got1[1..], got2[1..]);
    assert_eq!(got1[0].data["asks"][0][0], "50000.00");

    mux.unsubscribe(1, StreamKind::OrderBook, "BTC/USDT");
    assert!(mux.active_symbols().contains("BTC/USDT"));
    mux.unsubscribe(2, StreamKind::OrderBook, "BTC/USDT");
    assert!(mux.active_symbols().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.book_fetches.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn each_tick_carries_fresh_data() {
    let source = Arc::new(CountingSource::default());
    let mux = Multiplexer::new(Arc::clone(&source), &config());
    let (tx, mut rx) = mpsc::unbounded_channel();

    assert!(mux.subscribe(1, StreamKind::Ticker, "BTC/USDT", tx).await);
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let prices: Vec<Value> = drain(&mut rx).into_iter().map(|m| m.data["price"].clone()).collect();
    assert_eq!(prices, vec![json!("50000.00"), json!("50001.00"), json!("50002.00")]);
}

#[tokio::test(start_paused = true)]
async fn disabled_symbol_is_refused() {
    let source = Arc::new(CountingSource::default());
    let mux = Multiplexer::new(Arc::clone(&source), &config());
    let (tx, mut rx) = mpsc::unbounded_channel();

    assert!(!mux.subscribe(7, StreamKind::Ticker, "DOGE/USDT", tx).await);
    assert!(mux.active_symbols().is_empty());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(drain(&mut rx).is_empty());
    assert_eq!(source.ticker_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_stream_does_not_block_others() {
    let source = Arc::new(CountingSource {
        fail_book: true,
        ..CountingSource::default()
    });
    let mux = Multiplexer::new(Arc::clone(&source), &config());
    let (tx, mut rx) = mpsc::unbounded_channel();

    assert!(mux.subscribe(1, StreamKind::OrderBook, "BTC/USDT", tx.clone()).await);
    assert!(mux.subscribe(1, StreamKind::Ticker, "BTC/USDT", tx).await);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let got = drain(&mut rx);
    assert!(got.iter().all(|m| m.stream == StreamKind::Ticker));
    assert_eq!(got.len(), 3);
    // Book was still attempted on every tick.
    assert_eq!(source.book_fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn dropped_receivers_are_pruned_and_feed_stops() {
    let source = Arc::new(CountingSource::default());
    let mux = Multiplexer::new(Arc::clone(&source), &config());
    let (tx, rx) = mpsc::unbounded_channel();

    assert!(mux.subscribe(1, StreamKind::OrderBook, "BTC/USDT", tx).await);
    drop(rx);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(mux.subscriber_count("BTC/USDT", StreamKind::OrderBook), 0);
    assert!(mux.active_symbols().is_empty());

    let fetches = source.book_fetches.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.book_fetches.load(Ordering::SeqCst), fetches);
}

#[tokio::test(start_paused = true)]
async fn disconnect_removes_every_subscription() {
    let source = Arc::new(CountingSource::default());
    let mux = Multiplexer::new(Arc::clone(&source), &config());
    let (tx, _rx) = mpsc::unbounded_channel();
    let (other_tx, _other_rx) = mpsc::unbounded_channel();

    assert!(mux.subscribe(1, StreamKind::Ticker, "BTC/USDT", tx.clone()).await);
    assert!(mux.subscribe(1, StreamKind::Trades, "BTC/USDT", tx).await);
    assert!(mux.subscribe(2, StreamKind::Trades, "BTC/USDT", other_tx).await);

    mux.disconnect(1);
    assert_eq!(mux.subscriber_count("BTC/USDT", StreamKind::Ticker), 0);
    assert_eq!(mux.subscriber_count("BTC/USDT", StreamKind::Trades), 1);
    assert!(mux.active_symbols().contains("BTC/USDT"));

    mux.disconnect(2);
    assert!(mux.active_symbols().is_empty());
}

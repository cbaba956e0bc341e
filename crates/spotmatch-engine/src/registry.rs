//! Routing of requests to per-symbol engines.
//!
//! The registry is built once at startup and shared behind an `Arc`. It
//! validates client input against the [`MarketCatalog`] before anything
//! reaches an engine, so a rejected order never touches balances or books.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use spotmatch_ledger::{LedgerStore, Settler};
use spotmatch_marketdata::{
    CandleStore, DepthView, MarketDataSource, TickerStats, TickerView, TradeView,
    with_open_bucket,
};
use spotmatch_matchcore::{DepthSnapshot, trade_root_hex};
use spotmatch_types::{
    BalanceEntry, Candle, CandleInterval, EngineConfig, MarketCatalog, MarketConfig, Order,
    OrderId, OrderRequest, Result, SpotmatchError, Trade, UserId, WalletKey,
};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::command::{Command, OrderTicket, Reply, SubmitOutcome};
use crate::symbol::SymbolEngine;

/// Sending side of one symbol engine.
#[derive(Clone)]
struct EngineHandle {
    symbol: String,
    commands: mpsc::Sender<Command>,
}

impl EngineHandle {
    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SpotmatchError::EngineUnavailable(self.symbol.clone()))?;
        response
            .await
            .map_err(|_| SpotmatchError::EngineUnavailable(self.symbol.clone()))
    }
}

/// All engines of a node, keyed by symbol.
pub struct EngineRegistry {
    catalog: MarketCatalog,
    engines: HashMap<String, EngineHandle>,
    ledger: Arc<dyn LedgerStore>,
    candles: Arc<dyn CandleStore>,
}

impl EngineRegistry {
    /// Rebuild and start one engine per enabled market.
    ///
    /// Must be called inside a tokio runtime.
    pub async fn start(
        catalog: MarketCatalog,
        ledger: Arc<dyn LedgerStore>,
        candles: Arc<dyn CandleStore>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let mut engines = HashMap::new();
        for market in catalog.iter().filter(|m| m.is_enabled()) {
            let symbol = market.symbol();
            let settler = Settler::new(Arc::clone(&ledger), config);
            let mut engine = SymbolEngine::new(
                market.clone(),
                settler,
                Arc::clone(&candles),
                &config.candle_intervals,
            );
            engine.rebuild().await?;

            let (commands, receiver) = mpsc::channel(config.command_buffer.max(1));
            tokio::spawn(engine.run(receiver));
            engines.insert(symbol.clone(), EngineHandle { symbol, commands });
        }
        info!(markets = catalog.len(), running = engines.len(), "engine registry started");
        Ok(Self {
            catalog,
            engines,
            ledger,
            candles,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &MarketCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Symbols with a running engine, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.engines.keys().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    fn engine(&self, symbol: &str) -> Result<&EngineHandle> {
        self.catalog.enabled(symbol)?;
        self.engines
            .get(symbol)
            .ok_or_else(|| SpotmatchError::EngineUnavailable(symbol.to_string()))
    }

    /// Parse and validate a ticket. No state is touched.
    pub fn prepare(&self, ticket: &OrderTicket) -> Result<(&MarketConfig, OrderRequest)> {
        let market = self.catalog.enabled(&ticket.symbol)?;
        let amount = market.parse_amount(&ticket.amount)?;
        let price = ticket
            .price
            .as_deref()
            .map(|p| market.parse_price(p))
            .transpose()?;
        let request = OrderRequest {
            user_id: ticket.user_id,
            symbol: market.symbol(),
            side: ticket.side,
            order_type: ticket.order_type,
            amount,
            price,
        };
        request.validate_shape()?;
        let cost = price.map(|p| market.cost_of(amount, p)).transpose()?;
        market.check_limits(amount, price, cost)?;
        Ok((market, request))
    }

    /// Validate, reserve funds, match and settle one order.
    pub async fn submit_order(&self, ticket: &OrderTicket) -> Result<SubmitOutcome> {
        let (_, request) = self.prepare(ticket)?;
        let engine = self.engine(&request.symbol)?;
        engine
            .call(|reply| Command::Submit { request, reply })
            .await?
    }

    /// Cancel a resting order of `user_id`.
    pub async fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        let order = self
            .ledger
            .get_order(&order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(SpotmatchError::OrderNotFound(order_id))?;
        let engine = self.engine(&order.symbol)?;
        engine
            .call(|reply| Command::Cancel {
                order_id,
                user_id,
                reply,
            })
            .await?
    }

    pub async fn get_order_book(&self, symbol: &str, depth: usize) -> Result<DepthSnapshot> {
        self.engine(symbol)?
            .call(|reply| Command::Depth { depth, reply })
            .await
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<TickerStats> {
        self.engine(symbol)?
            .call(|reply| Command::Ticker { reply })
            .await
    }

    /// Most recent trades, newest first.
    pub async fn recent_trades(&self, symbol: &str) -> Result<Vec<Trade>> {
        self.engine(symbol)?
            .call(|reply| Command::RecentTrades { reply })
            .await
    }

    /// Resting orders of `user_id` on `symbol`.
    pub async fn open_orders(&self, symbol: &str, user_id: UserId) -> Result<Vec<Order>> {
        self.engine(symbol)?
            .call(|reply| Command::UserOrders { user_id, reply })
            .await
    }

    /// Closed candles in `[from, to]` plus the open bucket if it overlaps.
    pub async fn get_historical_candles(
        &self,
        symbol: &str,
        interval: CandleInterval,
        from: i64,
        to: i64,
    ) -> Result<Vec<Candle>> {
        let engine = self.engine(symbol)?;
        let closed = self.candles.range(symbol, interval, from, to).await?;
        let open = engine
            .call(|reply| Command::OpenCandle { interval, reply })
            .await?;
        Ok(with_open_bucket(closed, open.as_ref(), from, to))
    }

    /// Hex digest over the symbol's full trade history.
    pub async fn trade_root(&self, symbol: &str) -> Result<String> {
        self.catalog.get(symbol)?;
        let trades = self.ledger.trades(symbol).await?;
        Ok(trade_root_hex(&trades))
    }

    /// Resolve the precision and wallet family of `currency` from the first
    /// market that trades it.
    fn currency_wallet(&self, user_id: UserId, currency: &str) -> Result<(WalletKey, u32)> {
        self.catalog
            .iter()
            .find_map(|m| {
                let precision = if m.base == currency {
                    m.precision.amount
                } else if m.quote == currency {
                    m.precision.price
                } else {
                    return None;
                };
                Some((WalletKey::new(user_id, currency, m.wallet_type), precision))
            })
            .ok_or_else(|| SpotmatchError::MarketNotFound(currency.to_string()))
    }

    /// Credit `amount` (decimal string) to a user's wallet.
    pub async fn deposit(&self, user_id: UserId, currency: &str, amount: &str) -> Result<BalanceEntry> {
        let (key, precision) = self.currency_wallet(user_id, currency)?;
        let amount = spotmatch_types::fixed::to_integer(amount, precision)?;
        let entry = self.ledger.deposit(&key, amount).await?;
        info!(%user_id, %currency, amount, "deposit");
        Ok(entry)
    }

    pub async fn balance(&self, user_id: UserId, currency: &str) -> Result<BalanceEntry> {
        let (key, _) = self.currency_wallet(user_id, currency)?;
        self.ledger.balance(&key).await
    }

    /// Render a balance at its currency's precision.
    pub fn format_balance(&self, currency: &str, value: i128) -> Result<String> {
        let (_, precision) = self.currency_wallet(UserId::FEE_ACCOUNT, currency)?;
        Ok(spotmatch_types::fixed::to_decimal(value, precision))
    }
}

#[async_trait]
impl MarketDataSource for EngineRegistry {
    async fn is_enabled(&self, symbol: &str) -> bool {
        self.engine(symbol).is_ok()
    }

    async fn fetch_order_book(&self, symbol: &str, depth: usize) -> Result<DepthView> {
        let market = self.catalog.get(symbol)?;
        let snapshot = self.get_order_book(symbol, depth).await?;
        Ok(DepthView::from_snapshot(market, &snapshot))
    }

    async fn fetch_trades(&self, symbol: &str) -> Result<Vec<TradeView>> {
        let market = self.catalog.get(symbol)?;
        let trades = self.recent_trades(symbol).await?;
        Ok(trades
            .iter()
            .map(|t| TradeView::from_trade(market, t))
            .collect())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<TickerView> {
        let market = self.catalog.get(symbol)?;
        let stats = self.get_ticker(symbol).await?;
        Ok(TickerView::from_stats(market, &stats))
    }
}

//! The single-writer engine task of one symbol.
//!
//! It owns the symbol's [`OrderBook`] and [`MarketDataAggregator`]. Every
//! mutation arrives as a [`Command`] on one channel, so orders of a symbol
//! are matched strictly one after the other:
//!
//! ```text
//! submit ─► lock funds ─► insert order row ─► next_match ─┬─ Fill ─► settle ─► aggregate
//!                                                         ├─ SelfTradeCancelled ─► release maker
//!                                                         └─ Done ─► rest limit / cancel market
//! ```
//!
//! A fill whose settlement fails is undone in memory and the taker's
//! remainder is cancelled. A finished order whose release cannot be written
//! is parked and retried on every roll tick and before each submit. Its
//! owner can also cancel it, which writes the release at once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use spotmatch_ledger::{LedgerStore, MatchCommit, Settler};
use spotmatch_marketdata::{CandleStore, MarketDataAggregator};
use spotmatch_matchcore::{Fill, MatchStep, OrderBook, next_match, required_lock, undo_fill};
use spotmatch_types::constants::CANDLE_ROLL_INTERVAL_MS;
use spotmatch_types::{
    Candle, CandleInterval, MarketConfig, Order, OrderId, OrderRequest, OrderStatus, OrderType,
    Result, SpotmatchError, Trade, UserId, WalletKey,
};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::command::{Command, SubmitOutcome};

/// A finished order whose ledger row and lock release are not yet written.
struct PendingRelease {
    order: Order,
    key: WalletKey,
}

pub(crate) struct SymbolEngine {
    market: MarketConfig,
    symbol: String,
    book: OrderBook,
    settler: Settler,
    data: MarketDataAggregator,
    candles: Arc<dyn CandleStore>,
    pending: Vec<PendingRelease>,
    next_order_seq: u64,
    next_trade_seq: u64,
}

impl SymbolEngine {
    pub(crate) fn new(
        market: MarketConfig,
        settler: Settler,
        candles: Arc<dyn CandleStore>,
        intervals: &[CandleInterval],
    ) -> Self {
        let symbol = market.symbol();
        Self {
            book: OrderBook::new(market.pair()),
            data: MarketDataAggregator::new(symbol.clone(), intervals),
            market,
            symbol,
            settler,
            candles,
            pending: Vec::new(),
            next_order_seq: 1,
            next_trade_seq: 1,
        }
    }

    /// Rebuild in-memory state from the ledger.
    ///
    /// Trades are replayed first for sequence numbers and market data. Open
    /// order rows then go through matching again in arrival order, so a row
    /// persisted just before a crash cannot leave the book crossed. Market
    /// rows left open by a crash can no longer execute and are expired.
    pub(crate) async fn rebuild(&mut self) -> Result<()> {
        let store = self.store();
        let trades = store.trades(&self.symbol).await?;
        let open = store.open_orders(&self.symbol).await?;

        for trade in &trades {
            self.next_trade_seq = self.next_trade_seq.max(trade.sequence + 1);
            for candle in self.data.on_trade(trade) {
                self.store_candle(&candle).await;
            }
        }
        for order in &open {
            self.next_order_seq = self.next_order_seq.max(order.sequence + 1);
        }

        let (mut resting, mut expired, mut resumed) = (0, 0, 0);
        for order in open {
            if order.order_type == OrderType::Market {
                self.expire_interrupted(order).await?;
                expired += 1;
                continue;
            }
            let before = self.next_trade_seq;
            if self.resume(order).await? {
                resting += 1;
            }
            if self.next_trade_seq > before {
                resumed += 1;
            }
        }
        info!(
            symbol = %self.symbol,
            resting,
            expired,
            resumed,
            trades = trades.len(),
            next_trade_seq = self.next_trade_seq,
            "engine state rebuilt"
        );
        Ok(())
    }

    async fn expire_interrupted(&mut self, mut order: Order) -> Result<()> {
        order.expire()?;
        let key = self.wallet(order.user_id, &order);
        warn!(order_id = %order.id, "market order interrupted by restart expired");
        if let Err(e) = self.settler.finish(&order, &key).await {
            error!(order_id = %order.id, error = %e, "could not release expired order");
            self.park(order, key);
        }
        Ok(())
    }

    /// Match a stored limit row against the rebuilt book and rest what is
    /// left. Returns whether the order rests.
    async fn resume(&mut self, mut order: Order) -> Result<bool> {
        let key = self.wallet(order.user_id, &order);
        let mut trades = Vec::new();
        if let Err(e) = self.walk(&mut order, &mut trades).await {
            error!(order_id = %order.id, error = %e, "could not resume stored order");
            self.abandon(&mut order, &key).await;
            return Ok(false);
        }
        if !trades.is_empty() {
            warn!(
                order_id = %order.id,
                trades = trades.len(),
                "stored order crossed the book and was matched on restart"
            );
        }
        if order.remaining == 0 {
            return Ok(false);
        }
        self.book.insert(order)?;
        Ok(true)
    }

    /// Serve commands until every sender is gone.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let period = Duration::from_millis(CANDLE_ROLL_INTERVAL_MS);
        let mut roll = interval_at(Instant::now() + period, period);
        roll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(symbol = %self.symbol, "engine started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = roll.tick() => {
                    self.release_pending().await;
                    self.roll_candles(Utc::now().timestamp_millis()).await;
                }
            }
        }
        info!(symbol = %self.symbol, "engine stopped");
    }

    async fn handle(&mut self, command: Command) {
        if matches!(command, Command::Submit { .. }) {
            self.release_pending().await;
        }
        // A dropped reply receiver only means the caller went away.
        match command {
            Command::Submit { request, reply } => {
                let _ = reply.send(self.submit(request).await);
            }
            Command::Cancel {
                order_id,
                user_id,
                reply,
            } => {
                let _ = reply.send(self.cancel(order_id, user_id).await);
            }
            Command::Depth { depth, reply } => {
                let _ = reply.send(self.book.snapshot(depth));
            }
            Command::Ticker { reply } => {
                let _ = reply.send(self.data.ticker(Utc::now().timestamp_millis()));
            }
            Command::RecentTrades { reply } => {
                let _ = reply.send(self.data.recent_trades().cloned().collect());
            }
            Command::OpenCandle { interval, reply } => {
                let _ = reply.send(self.data.open_candle(interval).cloned());
            }
            Command::UserOrders { user_id, reply } => {
                let orders = self
                    .book
                    .orders_for_user(user_id)
                    .into_iter()
                    .cloned()
                    .collect();
                let _ = reply.send(orders);
            }
        }
    }

    fn wallet(&self, user_id: UserId, order: &Order) -> WalletKey {
        WalletKey::new(
            user_id,
            self.market.locked_currency(order.side),
            self.market.wallet_type,
        )
    }

    fn store(&self) -> Arc<dyn LedgerStore> {
        Arc::clone(self.settler.store())
    }

    // ------------------------------------------------------------------
    // Submit
    // ------------------------------------------------------------------

    async fn submit(&mut self, request: OrderRequest) -> Result<SubmitOutcome> {
        let locked = required_lock(&self.book, &request, &self.market)?;
        let lock_key = WalletKey::new(
            request.user_id,
            self.market.locked_currency(request.side),
            self.market.wallet_type,
        );
        let store = self.store();
        if locked > 0 {
            store.lock_funds(&lock_key, locked).await?;
        }

        let mut taker = Order::from_request(&request, self.next_order_seq, locked);
        if let Err(e) = store.insert_order(&taker).await {
            if locked > 0 {
                if let Err(release) = store.release_funds(&lock_key, locked).await {
                    error!(order_id = %taker.id, error = %release, "could not release lock of rejected order");
                }
            }
            return Err(e);
        }
        self.next_order_seq += 1;
        info!(
            symbol = %self.symbol,
            order_id = %taker.id,
            side = %taker.side,
            order_type = %taker.order_type,
            amount = %self.market.format_amount(taker.amount),
            locked,
            "order accepted"
        );

        let mut trades = Vec::new();
        if let Err(e) = self.walk(&mut taker, &mut trades).await {
            self.abandon(&mut taker, &lock_key).await;
            return Err(e);
        }

        let mut unfilled = 0;
        if taker.remaining > 0 {
            if taker.order_type == OrderType::Market {
                unfilled = taker.remaining;
                taker.cancel()?;
                match self.settler.finish(&taker, &lock_key).await {
                    Ok(()) => taker.locked = 0,
                    Err(e) => {
                        error!(
                            order_id = %taker.id,
                            error = %e,
                            "could not release market remainder"
                        );
                        self.park(taker.clone(), lock_key.clone());
                    }
                }
                info!(
                    order_id = %taker.id,
                    unfilled = %self.market.format_amount(unfilled),
                    "market order remainder cancelled"
                );
            } else {
                self.book.insert(taker.clone())?;
                debug!(order_id = %taker.id, "limit remainder resting");
            }
        }
        Ok(SubmitOutcome {
            order: taker,
            trades,
            unfilled,
        })
    }

    /// Match `taker` step by step, settling each fill before the next.
    async fn walk(&mut self, taker: &mut Order, trades: &mut Vec<Trade>) -> Result<()> {
        loop {
            match next_match(&mut self.book, taker, &self.market, self.next_trade_seq)? {
                MatchStep::Done => return Ok(()),
                MatchStep::SelfTradeCancelled(maker) => self.release_self_trade(maker).await?,
                MatchStep::Fill(fill) => {
                    let trade = self.settle_fill(taker, &fill).await?;
                    trades.push(trade);
                }
            }
        }
    }

    async fn settle_fill(&mut self, taker: &mut Order, fill: &Fill) -> Result<Trade> {
        let settled = match MatchCommit::new(
            &self.market,
            fill.trade.clone(),
            taker.clone(),
            fill.maker_after.clone(),
        ) {
            Ok(commit) => self.settler.settle(&commit).await.map(|()| commit),
            Err(e) => Err(e),
        };

        let commit = match settled {
            Ok(commit) => commit,
            Err(e) => {
                error!(
                    symbol = %self.symbol,
                    trade_id = %fill.trade.id,
                    error = %e,
                    "settlement failed, rolling back fill"
                );
                undo_fill(&mut self.book, taker, fill)?;
                return Err(e);
            }
        };

        self.next_trade_seq += 1;
        taker.locked = commit.taker.locked;
        info!(
            symbol = %self.symbol,
            sequence = fill.trade.sequence,
            price = %self.market.format_price(fill.trade.price),
            amount = %self.market.format_amount(fill.trade.amount),
            "trade"
        );
        for candle in self.data.on_trade(&fill.trade) {
            self.store_candle(&candle).await;
        }
        Ok(fill.trade.clone())
    }

    async fn release_self_trade(&mut self, maker: Order) -> Result<()> {
        let key = self.wallet(maker.user_id, &maker);
        if let Err(e) = self.settler.finish(&maker, &key).await {
            let mut resting = maker;
            resting.status = resting.derived_status();
            self.book.restore(resting)?;
            return Err(e);
        }
        info!(order_id = %maker.id, "resting order cancelled to prevent self-trade");
        Ok(())
    }

    /// Cancel what is left of a taker whose walk failed.
    async fn abandon(&mut self, taker: &mut Order, lock_key: &WalletKey) {
        if taker.status.is_terminal() {
            return;
        }
        if let Err(e) = taker.cancel() {
            error!(order_id = %taker.id, error = %e, "could not cancel failed taker");
            return;
        }
        match self.settler.finish(taker, lock_key).await {
            Ok(()) => taker.locked = 0,
            Err(e) => {
                error!(order_id = %taker.id, error = %e, "could not release failed taker");
                self.park(taker.clone(), lock_key.clone());
            }
        }
    }

    // ------------------------------------------------------------------
    // Pending releases
    // ------------------------------------------------------------------

    fn park(&mut self, order: Order, key: WalletKey) {
        warn!(
            symbol = %self.symbol,
            order_id = %order.id,
            locked = order.locked,
            "release parked until the ledger recovers"
        );
        self.pending.push(PendingRelease { order, key });
    }

    /// Retry every parked release once. Failures stay parked.
    async fn release_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut still_pending = Vec::new();
        for pending in std::mem::take(&mut self.pending) {
            match self.settler.finish(&pending.order, &pending.key).await {
                Ok(()) => info!(order_id = %pending.order.id, "parked release written"),
                Err(e) => {
                    debug!(
                        order_id = %pending.order.id,
                        error = %e,
                        "parked release still failing"
                    );
                    still_pending.push(pending);
                }
            }
        }
        self.pending = still_pending;
    }

    /// Write a parked release now on behalf of its owner.
    async fn finish_parked(
        &mut self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Option<Result<Order>> {
        let index = self
            .pending
            .iter()
            .position(|p| p.order.id == order_id && p.order.user_id == user_id)?;
        let pending = &self.pending[index];
        if let Err(e) = self.settler.finish(&pending.order, &pending.key).await {
            return Some(Err(e));
        }
        let mut order = self.pending.swap_remove(index).order;
        order.locked = 0;
        info!(symbol = %self.symbol, %order_id, "parked order released on cancel");
        Some(Ok(order))
    }

    /// Cancel for an order with no book entry: a parked release, or a stored
    /// row that never made it into the book.
    async fn cancel_unbooked(&mut self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        if let Some(parked) = self.finish_parked(order_id, user_id).await {
            return parked;
        }
        match self.store().get_order(&order_id).await? {
            Some(row) if row.user_id != user_id => Err(SpotmatchError::OrderNotFound(order_id)),
            Some(row) if row.status == OrderStatus::Filled => {
                Err(SpotmatchError::OrderAlreadyFilled(order_id))
            }
            Some(row) if !row.status.is_terminal() => self.cancel_stored(row).await,
            _ => Err(SpotmatchError::OrderNotFound(order_id)),
        }
    }

    async fn cancel_stored(&mut self, mut row: Order) -> Result<Order> {
        row.cancel()?;
        let key = self.wallet(row.user_id, &row);
        self.settler.finish(&row, &key).await?;
        row.locked = 0;
        warn!(
            symbol = %self.symbol,
            order_id = %row.id,
            "stored order without book entry cancelled"
        );
        Ok(row)
    }

    // ------------------------------------------------------------------
    // Cancel
    // ------------------------------------------------------------------

    async fn cancel(&mut self, order_id: OrderId, user_id: UserId) -> Result<Order> {
        match self.book.get(&order_id).map(|o| o.user_id) {
            Some(owner) if owner == user_id => {}
            Some(_) => return Err(SpotmatchError::OrderNotFound(order_id)),
            None => return self.cancel_unbooked(order_id, user_id).await,
        }

        let resting = self
            .book
            .cancel(&order_id)
            .ok_or(SpotmatchError::OrderNotFound(order_id))?;
        let mut order = resting.clone();
        order.cancel()?;
        let key = self.wallet(user_id, &order);
        if let Err(e) = self.settler.finish(&order, &key).await {
            self.book.restore(resting)?;
            return Err(e);
        }
        order.locked = 0;
        info!(symbol = %self.symbol, %order_id, "order cancelled");
        Ok(order)
    }

    // ------------------------------------------------------------------
    // Candles
    // ------------------------------------------------------------------

    async fn roll_candles(&mut self, now_ms: i64) {
        for candle in self.data.roll(now_ms) {
            self.store_candle(&candle).await;
        }
    }

    async fn store_candle(&self, candle: &Candle) {
        if let Err(e) = self.candles.append(candle).await {
            warn!(
                symbol = %self.symbol,
                interval = %candle.interval,
                open_time = candle.open_time,
                error = %e,
                "could not store closed candle"
            );
        }
    }
}

//! Continuous price-time priority matcher.
//!
//! Matching is exposed one step at a time so the caller can settle each
//! fill before the next one is produced:
//!
//! ```text
//! loop {
//!     match next_match(&mut book, &mut taker, &market, seq)? {
//!         MatchStep::Fill(fill) => settle(fill)?,      // or undo_fill on failure
//!         MatchStep::SelfTradeCancelled(maker) => release(maker)?,
//!         MatchStep::Done => break,
//!     }
//! }
//! ```
//!
//! ## Self-Trade Prevention
//!
//! When the best resting order belongs to the taker's own user, the resting
//! order is removed and cancelled and the walk continues with the next one.

use chrono::Utc;
use spotmatch_types::{MarketConfig, Order, Result, SpotmatchError, Trade, TradeId};
use tracing::trace;

use crate::OrderBook;

/// One fill produced by [`next_match`], with the state needed to undo it.
#[derive(Debug, Clone)]
pub struct Fill {
    pub trade: Trade,
    /// Maker as it was before this fill.
    pub maker_before: Order,
    /// Maker after this fill.
    pub maker_after: Order,
    /// The maker was fully filled and left the book.
    pub maker_removed: bool,
    /// Taker as it was before this fill.
    pub taker_before: Order,
}

/// Outcome of one matching step.
#[derive(Debug, Clone)]
pub enum MatchStep {
    /// The taker is exhausted or nothing on the opposite side crosses.
    Done,
    /// A resting order of the taker's own user was removed and cancelled.
    SelfTradeCancelled(Order),
    Fill(Box<Fill>),
}

/// Match `taker` against the best opposite order, if it crosses.
///
/// Executes at the maker's price for `min(taker.remaining, maker.remaining)`.
/// Cost is rounded down; each side's fee is the increase of its rounded
/// cumulative fee (taker rate for the taker, maker rate for the maker).
/// `sequence` becomes the trade's per-symbol sequence number.
pub fn next_match(
    book: &mut OrderBook,
    taker: &mut Order,
    market: &MarketConfig,
    sequence: u64,
) -> Result<MatchStep> {
    if taker.remaining == 0 {
        return Ok(MatchStep::Done);
    }
    let Some(maker) = book.front(taker.side.opposite()) else {
        return Ok(MatchStep::Done);
    };
    let maker_price = maker.price.ok_or_else(|| SpotmatchError::MatchingFailed {
        reason: format!("resting order {} has no price", maker.id),
    })?;
    if !taker.crosses(maker_price) {
        return Ok(MatchStep::Done);
    }

    if maker.user_id == taker.user_id {
        let maker_id = maker.id;
        let mut cancelled = book
            .cancel(&maker_id)
            .ok_or(SpotmatchError::OrderNotFound(maker_id))?;
        cancelled.cancel()?;
        trace!(order_id = %maker_id, "self-trade: resting order cancelled");
        return Ok(MatchStep::SelfTradeCancelled(cancelled));
    }

    let maker_before = maker.clone();
    let amount = taker.remaining.min(maker_before.remaining);
    let cost = market.cost_of(amount, maker_price)?;
    let price_precision = market.precision.price;

    let mut next_taker = taker.clone();
    let taker_fee = next_taker.apply_fill(amount, cost, market.taker, price_precision)?;
    let book_fill = book.apply_fill(
        &maker_before.id,
        amount,
        cost,
        market.maker,
        price_precision,
    )?;
    let taker_before = std::mem::replace(taker, next_taker);

    let trade = Trade {
        id: TradeId::deterministic(&taker.symbol, sequence),
        sequence,
        symbol: taker.symbol.clone(),
        taker_order_id: taker.id,
        taker_user_id: taker.user_id,
        maker_order_id: maker_before.id,
        maker_user_id: maker_before.user_id,
        taker_side: taker.side,
        price: maker_price,
        amount,
        cost,
        maker_fee: book_fill.fee,
        taker_fee,
        timestamp: Utc::now(),
    };
    trace!(%trade, "matched");

    Ok(MatchStep::Fill(Box::new(Fill {
        trade,
        maker_before,
        maker_after: book_fill.maker,
        maker_removed: book_fill.removed,
        taker_before,
    })))
}

/// Revert a fill: the maker regains its exact prior state and time
/// priority, the taker its state before the fill.
pub fn undo_fill(book: &mut OrderBook, taker: &mut Order, fill: &Fill) -> Result<()> {
    if fill.maker_removed {
        book.restore(fill.maker_before.clone())?;
    } else {
        book.replace(fill.maker_before.clone())?;
    }
    *taker = fill.taker_before.clone();
    Ok(())
}

//! Funds an order must lock before it reaches the book.
//!
//! - Sells lock the base `amount`.
//! - Limit buys lock `cost + fee` of quote at the limit price and the higher
//!   of the taker/maker rates, which bounds every way the order can fill.
//! - Market buys lock the exact cost and taker fee of walking the current
//!   asks, skipping the user's own orders (those are cancelled, not
//!   matched). Liquidity beyond the book is not reserved.

use spotmatch_types::constants::FEE_RATE_PRECISION;
use spotmatch_types::fixed::{self, Rounding};
use spotmatch_types::{MarketConfig, OrderRequest, OrderSide, OrderType, Result, SpotmatchError};

use crate::OrderBook;

/// Amount to lock for `request`, in the currency given by
/// [`MarketConfig::locked_currency`].
pub fn required_lock(book: &OrderBook, request: &OrderRequest, market: &MarketConfig) -> Result<i128> {
    match (request.side, request.order_type, request.price) {
        (OrderSide::Sell, _, _) => Ok(request.amount),
        (OrderSide::Buy, OrderType::Limit, Some(price)) => {
            let cost = market.cost_of(request.amount, price)?;
            let fee = market
                .max_fee_rate()
                .fee_on(cost, market.precision.price)?;
            fixed::add(cost, fee)
        }
        (OrderSide::Buy, OrderType::Market, _) => market_buy_lock(book, request, market),
        (OrderSide::Buy, OrderType::Limit, None) => Err(SpotmatchError::InvalidOrder {
            reason: "limit order requires a price".to_string(),
        }),
    }
}

fn market_buy_lock(book: &OrderBook, request: &OrderRequest, market: &MarketConfig) -> Result<i128> {
    let mut wanted = request.amount;
    let mut cost = 0i128;
    let mut fee_basis = 0i128;

    'walk: for level in book.levels(OrderSide::Sell) {
        for maker in level.orders.iter().filter(|o| o.user_id != request.user_id) {
            if wanted == 0 {
                break 'walk;
            }
            let amount = wanted.min(maker.remaining);
            let piece = market.cost_of(amount, level.price)?;
            cost = fixed::add(cost, piece)?;
            fee_basis = fixed::add(
                fee_basis,
                piece
                    .checked_mul(market.taker.raw())
                    .ok_or(SpotmatchError::Overflow)?,
            )?;
            wanted -= amount;
        }
    }

    let price_precision = market.precision.price;
    let fee = fixed::rescale(
        fee_basis,
        price_precision + FEE_RATE_PRECISION,
        price_precision,
        Rounding::HalfUp,
    )?;
    fixed::add(cost, fee)
}

#[cfg(test)]
mod tests {
    use spotmatch_types::*;

    use super::*;

    fn request(user: UserId, side: OrderSide, price: Option<i128>, amount: i128) -> OrderRequest {
        OrderRequest {
            user_id: user,
            symbol: "BTC/USDT".to_string(),
            side,
            order_type: if price.is_some() { OrderType::Limit } else { OrderType::Market },
            amount,
            price,
        }
    }

    fn ask(book: &mut OrderBook, user: UserId, price: i128, amount: i128, seq: u64) {
        let mut order = Order::dummy_limit_for_user(user, OrderSide::Sell, price, amount);
        order.sequence = seq;
        order.locked = amount;
        book.insert(order).unwrap();
    }

    #[test]
    fn sells_lock_base_amount() {
        let book = OrderBook::new(MarketPair::new("BTC", "USDT"));
        let market = MarketConfig::btc_usdt();
        let req = request(UserId::new(), OrderSide::Sell, None, 12_345);
        assert_eq!(required_lock(&book, &req, &market).unwrap(), 12_345);
    }

    #[test]
    fn limit_buy_locks_cost_plus_max_fee() {
        let book = OrderBook::new(MarketPair::new("BTC", "USDT"));
        let mut market = MarketConfig::btc_usdt();
        market.maker = FeeRate::parse("0.002").unwrap();
        // 0.5 BTC @ 100.00 = 50.00; 0.2% of that = 0.10
        let req = request(UserId::new(), OrderSide::Buy, Some(10_000), 50_000_000);
        assert_eq!(required_lock(&book, &req, &market).unwrap(), 5_000 + 10);
    }

    #[test]
    fn market_buy_walks_asks_and_skips_own() {
        let mut book = OrderBook::new(MarketPair::new("BTC", "USDT"));
        let market = MarketConfig::btc_usdt();
        let me = UserId::new();
        ask(&mut book, me, 9_000, 100_000_000, 1);
        ask(&mut book, UserId::new(), 10_000, 100_000_000, 2);
        ask(&mut book, UserId::new(), 20_000, 100_000_000, 3);

        // 1 BTC @ 100.00 + 0.5 BTC @ 200.00 = 200.00, fee 0.20
        let req = request(me, OrderSide::Buy, None, 150_000_000);
        assert_eq!(required_lock(&book, &req, &market).unwrap(), 20_000 + 20);

        // More than the book holds: only the available liquidity is locked.
        let req = request(me, OrderSide::Buy, None, 500_000_000);
        assert_eq!(required_lock(&book, &req, &market).unwrap(), 30_000 + 30);
    }

    #[test]
    fn market_buy_on_empty_book_locks_nothing() {
        let book = OrderBook::new(MarketPair::new("BTC", "USDT"));
        let req = request(UserId::new(), OrderSide::Buy, None, 1);
        assert_eq!(required_lock(&book, &req, &MarketConfig::btc_usdt()).unwrap(), 0);
    }
}

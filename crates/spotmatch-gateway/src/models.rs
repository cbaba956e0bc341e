//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};
use spotmatch_engine::SubmitOutcome;
use spotmatch_marketdata::TradeView;
use spotmatch_types::{
    CandleInterval, MarketConfig, Order, OrderSide, OrderStatus, OrderType, UserId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: String,
    pub user_id: UserId,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub price: Option<String>,
    pub amount: String,
    pub filled: String,
    pub remaining: String,
    pub cost: String,
    pub fee: String,
    pub created_at: i64,
}

impl OrderView {
    #[must_use]
    pub fn from_order(market: &MarketConfig, order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            user_id: order.user_id,
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: order.order_type,
            status: order.status,
            price: order.price.map(|p| market.format_price(p)),
            amount: market.format_amount(order.amount),
            filled: market.format_amount(order.filled),
            remaining: market.format_amount(order.remaining),
            cost: market.format_price(order.cost),
            fee: market.format_price(order.fee),
            created_at: order.created_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub order: OrderView,
    pub trades: Vec<TradeView>,
    /// Market quantity cancelled for lack of liquidity.
    pub unfilled: String,
    pub partial_fill: bool,
}

impl SubmitResponse {
    #[must_use]
    pub fn from_outcome(market: &MarketConfig, outcome: &SubmitOutcome) -> Self {
        Self {
            order: OrderView::from_order(market, &outcome.order),
            trades: outcome
                .trades
                .iter()
                .map(|t| TradeView::from_trade(market, t))
                .collect(),
            unfilled: market.format_amount(outcome.unfilled),
            partial_fill: outcome.is_partial(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    pub depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CandleQuery {
    pub interval: CandleInterval,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub user_id: UserId,
    pub currency: String,
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceView {
    pub currency: String,
    pub balance: String,
    pub in_order: String,
}

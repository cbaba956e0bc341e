use axum::Json;
use axum::extract::{Path, Query, State};
use spotmatch_marketdata::{CandleView, DepthView, MarketDataSource, TickerView};

use super::symbol;
use crate::error::AppError;
use crate::models::{CandleQuery, DepthQuery};
use crate::state::AppState;

pub async fn order_book(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<DepthView>, AppError> {
    let depth = query.depth.unwrap_or(state.default_depth);
    let view = state
        .registry
        .fetch_order_book(&symbol(&base, &quote), depth)
        .await?;
    Ok(Json(view))
}

pub async fn ticker(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
) -> Result<Json<TickerView>, AppError> {
    Ok(Json(
        state.registry.fetch_ticker(&symbol(&base, &quote)).await?,
    ))
}

pub async fn candles(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Vec<CandleView>>, AppError> {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(i64::MAX);
    if from > to {
        return Err(AppError::BadRequest(format!("from {from} is after to {to}")));
    }
    let symbol = symbol(&base, &quote);
    let market = state.registry.catalog().get(&symbol)?;
    let candles = state
        .registry
        .get_historical_candles(&symbol, query.interval, from, to)
        .await?;
    Ok(Json(
        candles
            .iter()
            .map(|c| CandleView::from_candle(market, c))
            .collect(),
    ))
}

#[derive(serde::Serialize)]
pub struct TradeRoot {
    pub symbol: String,
    pub root: String,
}

/// Digest over the full trade history, for cross-node comparison.
pub async fn trade_root(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
) -> Result<Json<TradeRoot>, AppError> {
    let symbol = symbol(&base, &quote);
    let root = state.registry.trade_root(&symbol).await?;
    Ok(Json(TradeRoot { symbol, root }))
}

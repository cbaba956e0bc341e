use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use spotmatch_engine::OrderTicket;
use spotmatch_types::OrderId;

use super::symbol;
use crate::error::AppError;
use crate::models::{OrderView, OwnerQuery, SubmitResponse};
use crate::state::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    Json(ticket): Json<OrderTicket>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let outcome = state.registry.submit_order(&ticket).await?;
    let market = state.registry.catalog().get(&outcome.order.symbol)?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse::from_outcome(market, &outcome)),
    ))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<OrderView>, AppError> {
    let order_id: OrderId = order_id.parse()?;
    let order = state.registry.cancel_order(order_id, owner.user_id).await?;
    let market = state.registry.catalog().get(&order.symbol)?;
    Ok(Json(OrderView::from_order(market, &order)))
}

pub async fn open_orders(
    State(state): State<AppState>,
    Path((base, quote)): Path<(String, String)>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Vec<OrderView>>, AppError> {
    let symbol = symbol(&base, &quote);
    let market = state.registry.catalog().get(&symbol)?;
    let orders = state.registry.open_orders(&symbol, owner.user_id).await?;
    Ok(Json(
        orders
            .iter()
            .map(|o| OrderView::from_order(market, o))
            .collect(),
    ))
}

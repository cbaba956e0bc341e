use axum::Json;
use axum::extract::{Path, State};
use spotmatch_types::UserId;

use crate::error::AppError;
use crate::models::{BalanceView, DepositRequest};
use crate::state::AppState;

/// Credit funds to a wallet of the in-memory ledger.
pub async fn deposit(
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<BalanceView>, AppError> {
    let currency = request.currency.to_uppercase();
    let entry = state
        .registry
        .deposit(request.user_id, &currency, &request.amount)
        .await?;
    Ok(Json(BalanceView {
        balance: state.registry.format_balance(&currency, entry.balance)?,
        in_order: state.registry.format_balance(&currency, entry.in_order)?,
        currency,
    }))
}

pub async fn balance(
    State(state): State<AppState>,
    Path((user_id, currency)): Path<(UserId, String)>,
) -> Result<Json<BalanceView>, AppError> {
    let currency = currency.to_uppercase();
    let entry = state.registry.balance(user_id, &currency).await?;
    Ok(Json(BalanceView {
        balance: state.registry.format_balance(&currency, entry.balance)?,
        in_order: state.registry.format_balance(&currency, entry.in_order)?,
        currency,
    }))
}

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{account, market, orders, ws};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/{id}", delete(orders::cancel_order))
        .route("/orders/{base}/{quote}", get(orders::open_orders))
        .route("/orderbook/{base}/{quote}", get(market::order_book))
        .route("/ticker/{base}/{quote}", get(market::ticker))
        .route("/candles/{base}/{quote}", get(market::candles))
        .route("/trades/{base}/{quote}/root", get(market::trade_root))
        .route("/deposits", post(account::deposit))
        .route("/balances/{user_id}/{currency}", get(account::balance));

    Router::new()
        .nest("/api", api)
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

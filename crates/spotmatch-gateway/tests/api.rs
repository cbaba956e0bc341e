//! HTTP API through the full router.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use spotmatch_gateway::{AppState, create_router};
use spotmatch_types::{AppConfig, UserId};
use tower::ServiceExt;

async fn app() -> Router {
    let state = AppState::in_memory(&AppConfig::default()).await.unwrap();
    create_router(state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn deposit(app: &Router, user: UserId, currency: &str, amount: &str) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/deposits",
        Some(json!({ "user_id": user, "currency": currency, "amount": amount })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn order_flow_over_http() {
    let app = app().await;
    let seller = UserId::new();
    let buyer = UserId::new();
    deposit(&app, seller, "BTC", "1").await;
    deposit(&app, buyer, "usdt", "100").await;

    let (status, ask) = call(
        &app,
        Method::POST,
        "/api/orders",
        Some(json!({
            "user_id": seller, "symbol": "BTC/USDT", "side": "sell",
            "type": "limit", "amount": "1", "price": "100.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{ask}");
    assert_eq!(ask["order"]["status"], "OPEN");

    let (status, buy) = call(
        &app,
        Method::POST,
        "/api/orders",
        Some(json!({
            "user_id": buyer, "symbol": "BTC/USDT", "side": "buy",
            "type": "market", "amount": "0.5"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{buy}");
    assert_eq!(buy["order"]["status"], "FILLED");
    assert_eq!(buy["trades"][0]["price"], "100.00");
    assert_eq!(buy["trades"][0]["amount"], "0.50000000");
    assert_eq!(buy["unfilled"], "0.00000000");
    assert_eq!(buy["partial_fill"], false);

    let (status, book) = call(&app, Method::GET, "/api/orderbook/BTC/USDT?depth=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["asks"][0], json!(["100.00", "0.50000000"]));

    let (_, ticker) = call(&app, Method::GET, "/api/ticker/btc/usdt", None).await;
    assert_eq!(ticker["price"], "100.00");
    assert_eq!(ticker["volume_24h"], "0.50000000");

    let (status, candles) = call(&app, Method::GET, "/api/candles/BTC/USDT?interval=1m", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(candles[0]["open"], "100.00");

    let (_, balance) = call(&app, Method::GET, &format!("/api/balances/{buyer}/USDT"), None).await;
    assert_eq!(balance["balance"], "49.95");
    assert_eq!(balance["in_order"], "0.00");

    let ask_id = ask["order"]["id"].as_str().unwrap();
    let (status, cancelled) = call(
        &app,
        Method::DELETE,
        &format!("/api/orders/{ask_id}?user_id={seller}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["status"], "CANCELLED");
    assert_eq!(cancelled["filled"], "0.50000000");

    let (status, root) = call(&app, Method::GET, "/api/trades/BTC/USDT/root", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["root"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn errors_carry_code_and_message() {
    let app = app().await;
    let user = UserId::new();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/orders",
        Some(json!({
            "user_id": user, "symbol": "BTC/USDT", "side": "buy",
            "type": "limit", "amount": "0.000000001", "price": "10"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "SM_ERR_100");
    assert!(body["message"].as_str().unwrap().contains("Precision exceeded"));

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/orders",
        Some(json!({
            "user_id": user, "symbol": "BTC/USDT", "side": "buy",
            "type": "limit", "amount": "1", "price": "10"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "SM_ERR_200");

    let missing = format!(
        "/api/orders/{}?user_id={user}",
        spotmatch_types::OrderId::new()
    );
    let (status, body) = call(&app, Method::DELETE, &missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SM_ERR_201");

    let (status, body) = call(&app, Method::GET, "/api/ticker/DOGE/USDT", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "SM_ERR_104");

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/candles/BTC/USDT?interval=1m&from=10&to=5",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

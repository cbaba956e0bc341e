//! Streaming endpoint.
//!
//! Clients send `{"action": "subscribe" | "unsubscribe", "type": "orderbook"
//! | "trades" | "ticker", "symbol": "BTC/USDT"}` and receive
//! `{"stream", "symbol", "data"}` pushes from the multiplexer.

use axum::extract::State;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use spotmatch_marketdata::{ClientId, StreamKind, StreamMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub action: Action,
    #[serde(rename = "type")]
    pub kind: StreamKind,
    pub symbol: String,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client = state.next_client_id();
    info!(client, "websocket connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<StreamMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "could not encode stream message");
                    continue;
                }
            };
            if sink.send(Message::Text(Utf8Bytes::from(text))).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => handle_text(&state, client, text.as_str(), &tx).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.feed.disconnect(client);
    writer.abort();
    info!(client, "websocket disconnected");
}

async fn handle_text(
    state: &AppState,
    client: ClientId,
    text: &str,
    tx: &mpsc::UnboundedSender<StreamMessage>,
) {
    let request: ClientMessage = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            warn!(client, error = %e, "malformed client message ignored");
            return;
        }
    };
    debug!(client, ?request, "client message");
    match request.action {
        Action::Subscribe => {
            let accepted = state
                .feed
                .subscribe(client, request.kind, &request.symbol, tx.clone())
                .await;
            if !accepted {
                let _ = tx.send(StreamMessage {
                    stream: request.kind,
                    symbol: request.symbol,
                    data: json!({ "error": "market unavailable" }),
                });
            }
        }
        Action::Unsubscribe => state.feed.unsubscribe(client, request.kind, &request.symbol),
    }
}

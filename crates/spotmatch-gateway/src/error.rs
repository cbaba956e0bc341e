use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use spotmatch_types::SpotmatchError;
use thiserror::Error;

/// Error returned by every HTTP handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] SpotmatchError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        let AppError::Engine(err) = self else {
            return StatusCode::BAD_REQUEST;
        };
        match err {
            SpotmatchError::MarketNotFound(_) | SpotmatchError::OrderNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SpotmatchError::OrderAlreadyFilled(_) | SpotmatchError::DuplicateOrder(_) => {
                StatusCode::CONFLICT
            }
            SpotmatchError::InsufficientBalance { .. }
            | SpotmatchError::UnknownInterval(_)
            | SpotmatchError::UnknownStream(_) => StatusCode::BAD_REQUEST,
            SpotmatchError::Storage(_)
            | SpotmatchError::SettlementFailed { .. }
            | SpotmatchError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Engine(err) => err.code(),
            AppError::BadRequest(_) => "BAD_REQUEST",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

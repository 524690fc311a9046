//! The error taxonomy the engine reports to its callers as structured
//! values, never as panics. `EngineError` is the single type threaded
//! through BalanceService, AssetService, OrderService and MatchingEngine;
//! routes translate it to HTTP using the `IntoResponse` impl below.

use axum::{http::StatusCode, response::IntoResponse, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::money::MoneyError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Decimal, required: Decimal },

    #[error("insufficient assets: available {available}, required {required}")]
    InsufficientAssets { available: Decimal, required: Decimal },

    #[error("insufficient locked amount: locked {locked}, required {required}")]
    InsufficientLocked { locked: Decimal, required: Decimal },

    #[error("not found")]
    NotFound,

    #[error("ownership violation")]
    OwnershipViolation,

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("unsupported partial match: buy amount {buy_amount} != sell amount {sell_amount}")]
    UnsupportedPartialMatch { buy_amount: Decimal, sell_amount: Decimal },

    #[error("transient error: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<MoneyError> for EngineError {
    fn from(err: MoneyError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<String>,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> axum::response::Response {
        use crate::money;

        let (status, body) = match &self {
            EngineError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody { error: msg.clone(), available: None, required: None },
            ),
            EngineError::InsufficientBalance { available, required } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "insufficient balance".into(),
                    available: Some(money::format(*available)),
                    required: Some(money::format(*required)),
                },
            ),
            EngineError::InsufficientAssets { available, required } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "insufficient assets".into(),
                    available: Some(money::format(*available)),
                    required: Some(money::format(*required)),
                },
            ),
            EngineError::InsufficientLocked { locked, required } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "insufficient locked amount".into(),
                    available: Some(money::format(*locked)),
                    required: Some(money::format(*required)),
                },
            ),
            EngineError::NotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody { error: "not found".into(), available: None, required: None },
            ),
            EngineError::OwnershipViolation => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody { error: "ownership violation".into(), available: None, required: None },
            ),
            EngineError::IllegalState(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody { error: msg.clone(), available: None, required: None },
            ),
            EngineError::UnsupportedPartialMatch { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody { error: "unsupported partial match".into(), available: None, required: None },
            ),
            EngineError::Transient(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorBody { error: msg.clone(), available: None, required: None },
            ),
            EngineError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: "internal error".into(), available: None, required: None },
                )
            }
            EngineError::Database(e) => {
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody { error: "internal error".into(), available: None, required: None },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

use axum::extract::{Path, Query, State};
use axum::{routing::get, Extension, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Order, OrderStatus, Side, Symbol, User};
use crate::money;
use crate::services::order_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderPayload {
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub side: String,
    pub price: String,
    pub amount: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

fn order_to_response(order: &Order) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        user_id: order.user_id.to_string(),
        symbol: order.symbol.clone(),
        side: order.side.as_str().to_string(),
        price: money::format(order.price),
        amount: money::format(order.amount),
        status: order.status.as_str().to_string(),
        created_at: order.created_at.to_rfc3339(),
        updated_at: order.updated_at.to_rfc3339(),
    }
}

#[derive(Debug, Serialize)]
pub struct OrderEnvelope {
    pub order: OrderResponse,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrdersListResponse {
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Deserialize)]
pub struct OrderbookQuery {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct OrderbookResponse {
    pub symbol: String,
    pub buy_orders: Vec<OrderResponse>,
    pub sell_orders: Vec<OrderResponse>,
}

/// `/api/orders`, `/api/orders/:id/cancel`, `/api/orderbook` — all require
/// the auth middleware (§6: the book itself is scoped to a logged-in user
/// in this deployment).
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/:id/cancel", axum::routing::post(cancel_order))
        .route("/orderbook", get(orderbook))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<PlaceOrderPayload>,
) -> Result<(axum::http::StatusCode, Json<OrderEnvelope>), EngineError> {
    let order = order_service::create_order(
        &state.pool,
        &state.audit,
        &state.events,
        user.id,
        payload.symbol,
        payload.side,
        payload.price,
        payload.amount,
    )
    .await?;

    Ok((axum::http::StatusCode::CREATED, Json(OrderEnvelope { order: order_to_response(&order) })))
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrdersListResponse>, EngineError> {
    let status_filter = match query.status.as_deref() {
        Some("open") => Some(OrderStatus::Open),
        Some("filled") => Some(OrderStatus::Filled),
        Some("cancelled") => Some(OrderStatus::Cancelled),
        Some(other) => return Err(EngineError::Validation(format!("unknown status: {other}"))),
        None => None,
    };

    let orders = order_service::list_orders(&state.pool, user.id, status_filter).await?;

    Ok(Json(OrdersListResponse { orders: orders.iter().map(order_to_response).collect() }))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderEnvelope>, EngineError> {
    let order = order_service::cancel_order(&state.pool, &state.audit, user.id, order_id).await?;
    Ok(Json(OrderEnvelope { order: order_to_response(&order) }))
}

async fn orderbook(
    State(state): State<AppState>,
    Extension(_user): Extension<User>,
    Query(query): Query<OrderbookQuery>,
) -> Result<Json<OrderbookResponse>, EngineError> {
    let symbol = Symbol::from_str(&query.symbol)?;
    let (buy_orders, sell_orders) = order_service::orderbook(&state.pool, symbol).await?;

    Ok(Json(OrderbookResponse {
        symbol: symbol.as_str().to_string(),
        buy_orders: buy_orders.iter().map(order_to_response).collect(),
        sell_orders: sell_orders.iter().map(order_to_response).collect(),
    }))
}

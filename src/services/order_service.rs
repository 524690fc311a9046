//! §4.5 OrderService: create / cancel / query orders, coordinating
//! fund-or-asset locking with order insertion and the matching engine.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{actions, AuditService};
use crate::errors::EngineError;
use crate::events::{AssetView, EventService, OrderMatchedPayload, TradeView, UserBalanceView};
use crate::models::{Asset, Order, OrderStatus, Side, Symbol, User};
use crate::money;
use crate::services::{asset_service, balance_service, matching_engine};

pub async fn create_order(
    pool: &PgPool,
    audit: &AuditService,
    events: &EventService,
    user_id: Uuid,
    symbol: Symbol,
    side: Side,
    price: Decimal,
    amount: Decimal,
) -> Result<Order, EngineError> {
    if !money::is_positive(price) || !money::has_valid_precision(price) {
        return Err(EngineError::Validation("price must be positive with at most 8 fractional digits".into()));
    }
    if !money::is_positive(amount) || !money::has_valid_precision(amount) {
        return Err(EngineError::Validation("amount must be positive with at most 8 fractional digits".into()));
    }

    let mut tx = pool.begin().await?;

    match side {
        Side::Buy => {
            let cost = money::checked_mul(price, amount)?;
            balance_service::lock_funds(&mut tx, user_id, cost).await?;
        }
        Side::Sell => {
            asset_service::lock_assets(&mut tx, user_id, symbol, amount).await?;
        }
    }

    let order = Order::insert(&mut tx, user_id, symbol.as_str(), side, price, amount).await?;
    let settlement = matching_engine::process(&mut tx, order.id).await?;

    tx.commit().await?;

    audit
        .log(Some(user_id), actions::ORDER_PLACED, "order", Some(order.id), None, None)
        .await;

    let final_order = if settlement.is_some() {
        Order::find_by_id(pool, order.id)
            .await?
            .ok_or_else(|| EngineError::Internal("order vanished after commit".into()))?
    } else {
        order
    };

    if let Some(settlement) = settlement {
        emit_trade_side_effects(pool, audit, events, &settlement.trade, settlement.buyer_id, settlement.seller_id)
            .await;
    }

    Ok(final_order)
}

async fn emit_trade_side_effects(
    pool: &PgPool,
    audit: &AuditService,
    events: &EventService,
    trade: &crate::models::Trade,
    buyer_id: Uuid,
    seller_id: Uuid,
) {
    audit
        .log(
            Some(buyer_id),
            actions::TRADE_EXECUTED_BUY,
            "trade",
            Some(trade.id),
            Some(serde_json::json!({ "symbol": trade.symbol, "price": money::format(trade.price), "amount": money::format(trade.amount) })),
            None,
        )
        .await;
    audit
        .log(
            Some(seller_id),
            actions::TRADE_EXECUTED_SELL,
            "trade",
            Some(trade.id),
            Some(serde_json::json!({ "symbol": trade.symbol, "price": money::format(trade.price), "amount": money::format(trade.amount) })),
            None,
        )
        .await;

    for party in [buyer_id, seller_id] {
        match build_order_matched_payload(pool, trade, party).await {
            Ok(payload) => events.publish(party, "order.matched", &payload).await,
            Err(err) => {
                tracing::warn!(user_id = %party, error = %err, "failed to build event payload, event dropped");
            }
        }
    }
}

async fn build_order_matched_payload(
    pool: &PgPool,
    trade: &crate::models::Trade,
    user_id: Uuid,
) -> Result<OrderMatchedPayload, EngineError> {
    let user = User::find_by_id(pool, user_id).await?.ok_or(EngineError::NotFound)?;
    let assets = Asset::get_all_for_user(pool, user_id).await?;

    Ok(OrderMatchedPayload {
        trade: TradeView {
            id: trade.id,
            buy_order_id: trade.buy_order_id,
            sell_order_id: trade.sell_order_id,
            buyer_id: trade.buyer_id,
            seller_id: trade.seller_id,
            symbol: trade.symbol.clone(),
            price: money::format(trade.price),
            amount: money::format(trade.amount),
            volume: money::format(trade.volume),
            commission: money::format(trade.commission),
            created_at: trade.created_at.to_rfc3339(),
        },
        user_balance: UserBalanceView { usd_balance: money::format(user.balance) },
        user_assets: assets
            .into_iter()
            .map(|a| AssetView {
                symbol: a.symbol.clone(),
                total: money::format(a.amount),
                locked: money::format(a.locked_amount),
                available: money::format(a.available()),
            })
            .collect(),
    })
}

pub async fn cancel_order(
    pool: &PgPool,
    audit: &AuditService,
    user_id: Uuid,
    order_id: Uuid,
) -> Result<Order, EngineError> {
    let mut tx = pool.begin().await?;

    let order = Order::lock_for_update(&mut tx, order_id).await?;
    if order.user_id != user_id {
        return Err(EngineError::OwnershipViolation);
    }
    if order.status != OrderStatus::Open {
        return Err(EngineError::IllegalState(format!("order is {}", order.status.as_str())));
    }

    let symbol: Symbol = order.symbol.parse()?;
    match order.side {
        Side::Buy => {
            let cost = money::checked_mul(order.price, order.amount)?;
            balance_service::release_funds(&mut tx, user_id, cost).await?;
        }
        Side::Sell => {
            asset_service::release_assets(&mut tx, user_id, symbol, order.amount).await?;
        }
    }

    let cancelled = Order::mark_cancelled(&mut tx, order_id).await?;
    tx.commit().await?;

    audit
        .log(Some(user_id), actions::ORDER_CANCELLED, "order", Some(order_id), None, None)
        .await;

    Ok(cancelled)
}

pub async fn list_orders(
    pool: &PgPool,
    user_id: Uuid,
    status_filter: Option<OrderStatus>,
) -> Result<Vec<Order>, EngineError> {
    Ok(Order::list_for_user(pool, user_id, status_filter).await?)
}

pub async fn orderbook(pool: &PgPool, symbol: Symbol) -> Result<(Vec<Order>, Vec<Order>), EngineError> {
    Ok(Order::orderbook(pool, symbol.as_str()).await?)
}

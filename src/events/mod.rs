//! §4.7 EventPublisher: best-effort, at-most-once, unordered delivery of
//! `order.matched` notifications. The trait mirrors the teacher's
//! `MailProvider`/`MailService` shape — an `Arc<dyn Trait>` behind a thin
//! wrapper, selected by environment at startup.

mod console;
mod redis_publisher;

pub use console::ConsoleEventPublisher;
pub use redis_publisher::RedisEventPublisher;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, user_id: Uuid, event_name: &str, payload: &OrderMatchedPayload) -> Result<(), EventError>;
}

/// Payload for `order.matched`, exactly as specified in §4.7: the trade,
/// the receiving party's post-settlement balance, and their full asset map.
#[derive(Debug, Clone, Serialize)]
pub struct OrderMatchedPayload {
    pub trade: TradeView,
    pub user_balance: UserBalanceView,
    pub user_assets: Vec<AssetView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    pub id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub symbol: String,
    pub price: String,
    pub amount: String,
    pub volume: String,
    pub commission: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserBalanceView {
    pub usd_balance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    pub symbol: String,
    pub total: String,
    pub locked: String,
    pub available: String,
}

pub fn channel_for_user(user_id: Uuid) -> String {
    format!("user.{user_id}")
}

/// Thin `Arc<dyn EventPublisher>` wrapper, constructed once at startup and
/// cloned into `AppState`.
#[derive(Clone)]
pub struct EventService(Arc<dyn EventPublisher>);

impl EventService {
    pub fn new(publisher: impl EventPublisher + 'static) -> Self {
        Self(Arc::new(publisher))
    }

    pub async fn publish(&self, user_id: Uuid, event_name: &str, payload: &OrderMatchedPayload) {
        if let Err(err) = self.0.publish(user_id, event_name, payload).await {
            tracing::warn!(%user_id, event_name, error = %err, "event publish failed, trade already committed");
        }
    }
}

/// Builds the configured publisher from environment: `console` (default,
/// logs the payload) or `redis` (publishes JSON to `user.{id}` channels).
pub fn create_event_service(redis_url: Option<&str>) -> EventService {
    match redis_url {
        Some(url) if !url.is_empty() => {
            tracing::info!("event publisher: redis ({})", url);
            EventService::new(RedisEventPublisher::new(url))
        }
        _ => {
            tracing::info!("event publisher: console (dev)");
            EventService::new(ConsoleEventPublisher)
        }
    }
}

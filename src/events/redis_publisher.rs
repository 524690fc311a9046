use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{EventError, EventPublisher, OrderMatchedPayload};

/// Publishes JSON-encoded payloads to the per-user channel `user.{id}`.
/// The connection manager reconnects transparently; publish failures are
/// surfaced to the caller, who (per §4.7) logs and drops them rather than
/// retrying.
pub struct RedisEventPublisher {
    redis_url: String,
    connection: OnceCell<ConnectionManager>,
}

impl RedisEventPublisher {
    pub fn new(redis_url: &str) -> Self {
        Self { redis_url: redis_url.to_string(), connection: OnceCell::new() }
    }

    async fn connection(&self) -> Result<ConnectionManager, EventError> {
        let conn = self
            .connection
            .get_or_try_init(|| async {
                let client = redis::Client::open(self.redis_url.as_str())
                    .map_err(|e| EventError::PublishFailed(e.to_string()))?;
                client
                    .get_connection_manager()
                    .await
                    .map_err(|e| EventError::PublishFailed(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(
        &self,
        user_id: Uuid,
        event_name: &str,
        payload: &OrderMatchedPayload,
    ) -> Result<(), EventError> {
        let mut conn = self.connection().await?;
        let channel = super::channel_for_user(user_id);
        let envelope = serde_json::json!({ "event": event_name, "payload": payload });
        let message = serde_json::to_string(&envelope)
            .map_err(|e| EventError::PublishFailed(e.to_string()))?;

        conn.publish::<_, _, i64>(&channel, message)
            .await
            .map_err(|e| EventError::PublishFailed(e.to_string()))?;

        Ok(())
    }
}

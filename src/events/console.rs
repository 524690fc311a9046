use async_trait::async_trait;
use uuid::Uuid;

use super::{EventError, EventPublisher, OrderMatchedPayload};

/// Development publisher: logs the payload instead of delivering it over a
/// real transport. Mirrors the teacher's `ConsoleProvider` for mail.
pub struct ConsoleEventPublisher;

#[async_trait]
impl EventPublisher for ConsoleEventPublisher {
    async fn publish(
        &self,
        user_id: Uuid,
        event_name: &str,
        payload: &OrderMatchedPayload,
    ) -> Result<(), EventError> {
        tracing::info!(
            channel = %super::channel_for_user(user_id),
            event_name,
            trade_id = %payload.trade.id,
            "event published (console)"
        );
        Ok(())
    }
}

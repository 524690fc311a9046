use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_kind: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &PgPool,
        user_id: Option<Uuid>,
        action: &str,
        entity_kind: &str,
        entity_id: Option<Uuid>,
        details: Option<serde_json::Value>,
        ip: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO audit_logs (id, user_id, action, entity_kind, entity_id, details, ip)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action)
        .bind(entity_kind)
        .bind(entity_id)
        .bind(details)
        .bind(ip)
        .fetch_one(pool)
        .await
    }
}

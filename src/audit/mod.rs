//! §4.8 AuditSink: append-only log, failures must never fail the
//! surrounding business transaction.
//!
//! The matching engine's settlement already runs inside a single
//! `sqlx::Transaction`; a literal mid-transaction append that errors would
//! poison that transaction at the Postgres level (any statement error
//! aborts the transaction until rollback), which is the opposite of "must
//! be swallowed." This sink is therefore invoked after the business
//! transaction commits, on the same `PgPool` the rest of the engine uses —
//! the identical post-commit placement the spec already mandates for
//! `EventPublisher` (§4.6 step 11, §5). See DESIGN.md for the reasoning.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::AuditEntry;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_kind: &str,
        entity_id: Option<Uuid>,
        details: Option<Value>,
        ip: Option<&str>,
    );
}

pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn log(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_kind: &str,
        entity_id: Option<Uuid>,
        details: Option<Value>,
        ip: Option<&str>,
    ) {
        if let Err(err) =
            AuditEntry::insert(&self.pool, user_id, action, entity_kind, entity_id, details, ip).await
        {
            tracing::warn!(action, entity_kind, error = %err, "audit write failed, swallowed");
        }
    }
}

#[derive(Clone)]
pub struct AuditService(Arc<dyn AuditSink>);

impl AuditService {
    pub fn new(sink: impl AuditSink + 'static) -> Self {
        Self(Arc::new(sink))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_kind: &str,
        entity_id: Option<Uuid>,
        details: Option<Value>,
        ip: Option<&str>,
    ) {
        self.0.log(user_id, action, entity_kind, entity_id, details, ip).await
    }
}

/// Action tags the engine itself appends (§4.8: "at least
/// TRADE_EXECUTED_BUY, TRADE_EXECUTED_SELL"). Orchestrator-level tags
/// (login, cancel) are free-form strings passed directly by the routes.
pub mod actions {
    pub const TRADE_EXECUTED_BUY: &str = "TRADE_EXECUTED_BUY";
    pub const TRADE_EXECUTED_SELL: &str = "TRADE_EXECUTED_SELL";
    pub const ORDER_PLACED: &str = "ORDER_PLACED";
    pub const ORDER_CANCELLED: &str = "ORDER_CANCELLED";
    pub const USER_REGISTERED: &str = "USER_REGISTERED";
    pub const USER_LOGIN: &str = "USER_LOGIN";
    pub const USER_LOGOUT: &str = "USER_LOGOUT";
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::EngineError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .await
    }

    /// Locks the user row for the remainder of the transaction. Every
    /// BalanceService mutation goes through this first, per the Store
    /// contract's `lockUser`.
    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Self, EngineError> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(EngineError::NotFound)
    }

    /// Locks two user rows in ascending id order, honoring the deadlock
    /// avoidance rule that any transaction touching two users must acquire
    /// both locks in `(entity_kind, id)` order.
    pub async fn lock_two_for_update(
        tx: &mut Transaction<'_, Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> Result<(Self, Self), EngineError> {
        if a == b {
            let user = Self::lock_for_update(tx, a).await?;
            return Ok((user.clone(), user));
        }
        let (first_id, second_id) = if a < b { (a, b) } else { (b, a) };
        let first = Self::lock_for_update(tx, first_id).await?;
        let second = Self::lock_for_update(tx, second_id).await?;
        if a < b {
            Ok((first, second))
        } else {
            Ok((second, first))
        }
    }

    pub async fn set_balance(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        balance: Decimal,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE users SET balance = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(balance)
        .bind(id)
        .fetch_one(&mut **tx)
        .await
    }
}

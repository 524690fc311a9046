use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::Symbol;
use crate::errors::EngineError;

pub const SEED_BTC: &str = "1.00000000";
pub const SEED_ETH: &str = "10.00000000";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Asset {
    pub user_id: Uuid,
    pub symbol: String,
    pub amount: Decimal,
    pub locked_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn available(&self) -> Decimal {
        self.amount - self.locked_amount
    }

    pub async fn get_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM assets WHERE user_id = $1 ORDER BY symbol")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn get(
        pool: &PgPool,
        user_id: Uuid,
        symbol: Symbol,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM assets WHERE user_id = $1 AND symbol = $2")
            .bind(user_id)
            .bind(symbol.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Returns the existing row locked for update, creating a zeroed one
    /// first if it doesn't exist yet.
    pub async fn get_or_create_for_update(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        symbol: Symbol,
    ) -> Result<Self, EngineError> {
        sqlx::query(
            "INSERT INTO assets (user_id, symbol, amount, locked_amount)
             VALUES ($1, $2, 0, 0)
             ON CONFLICT (user_id, symbol) DO NOTHING",
        )
        .bind(user_id)
        .bind(symbol.as_str())
        .execute(&mut **tx)
        .await?;

        sqlx::query_as::<_, Self>(
            "SELECT * FROM assets WHERE user_id = $1 AND symbol = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(symbol.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(EngineError::Internal("asset row vanished after insert".into()))
    }

    /// Locks two (user, symbol) rows in ascending `(user_id, symbol)` order,
    /// used by `transferAssets` between a buyer and seller.
    pub async fn lock_two_for_update(
        tx: &mut Transaction<'_, Postgres>,
        a_user: Uuid,
        a_symbol: Symbol,
        b_user: Uuid,
        b_symbol: Symbol,
    ) -> Result<(Self, Self), EngineError> {
        let a_key = (a_user, a_symbol.as_str());
        let b_key = (b_user, b_symbol.as_str());

        if a_key == b_key {
            let row = Self::get_or_create_for_update(tx, a_user, a_symbol).await?;
            return Ok((row.clone(), row));
        }

        if a_key < b_key {
            let first = Self::get_or_create_for_update(tx, a_user, a_symbol).await?;
            let second = Self::get_or_create_for_update(tx, b_user, b_symbol).await?;
            Ok((first, second))
        } else {
            let second = Self::get_or_create_for_update(tx, b_user, b_symbol).await?;
            let first = Self::get_or_create_for_update(tx, a_user, a_symbol).await?;
            Ok((first, second))
        }
    }

    pub async fn update(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        symbol: Symbol,
        amount: Decimal,
        locked_amount: Decimal,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE assets SET amount = $1, locked_amount = $2, updated_at = NOW()
             WHERE user_id = $3 AND symbol = $4 RETURNING *",
        )
        .bind(amount)
        .bind(locked_amount)
        .bind(user_id)
        .bind(symbol.as_str())
        .fetch_one(&mut **tx)
        .await
    }
}

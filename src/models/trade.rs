use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub symbol: String,
    pub price: Decimal,
    pub amount: Decimal,
    pub volume: Decimal,
    pub commission: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        buy_order_id: Uuid,
        sell_order_id: Uuid,
        buyer_id: Uuid,
        seller_id: Uuid,
        symbol: &str,
        price: Decimal,
        amount: Decimal,
        volume: Decimal,
        commission: Decimal,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO trades
                (id, buy_order_id, sell_order_id, buyer_id, seller_id, symbol, price, amount, volume, commission)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(buy_order_id)
        .bind(sell_order_id)
        .bind(buyer_id)
        .bind(seller_id)
        .bind(symbol)
        .bind(price)
        .bind(amount)
        .bind(volume)
        .bind(commission)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM trades WHERE buyer_id = $1 OR seller_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

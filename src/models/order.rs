use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        symbol: &str,
        side: Side,
        price: Decimal,
        amount: Decimal,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO orders (id, user_id, symbol, side, price, amount, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'open')
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(symbol)
        .bind(side)
        .bind(price)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn lock_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Self, EngineError> {
        sqlx::query_as::<_, Self>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(EngineError::NotFound)
    }

    /// Locks the new order and a candidate counter-order in ascending id
    /// order, per the matching engine's deadlock-avoidance rule.
    pub async fn lock_two_for_update(
        tx: &mut Transaction<'_, Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> Result<(Self, Self), EngineError> {
        let (first_id, second_id) = if a < b { (a, b) } else { (b, a) };
        let first = Self::lock_for_update(tx, first_id).await?;
        let second = Self::lock_for_update(tx, second_id).await?;
        if a < b {
            Ok((first, second))
        } else {
            Ok((second, first))
        }
    }

    /// Best compatible open counter-order for `side`/`symbol` at a price
    /// acceptable against `limit_price`, excluding ids already tried this
    /// matching pass (a prior candidate found Filled by a concurrent
    /// transaction). Ordered by best price then earliest `created_at`
    /// (the FIFO tie-break this spec declares as the intended behavior).
    pub async fn best_candidate(
        pool_or_tx: &mut Transaction<'_, Postgres>,
        symbol: &str,
        counter_side: Side,
        limit_price: Decimal,
        excluding: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        let (price_cmp, order_dir) = match counter_side {
            // New order is buy: counter side is sell, compatible if sell.price <= buy.price,
            // best is lowest price.
            Side::Sell => ("<=", "ASC"),
            // New order is sell: counter side is buy, compatible if buy.price >= sell.price,
            // best is highest price.
            Side::Buy => (">=", "DESC"),
        };

        let query = format!(
            "SELECT * FROM orders
             WHERE symbol = $1 AND side = $2 AND status = 'open' AND price {price_cmp} $3
               AND NOT (id = ANY($4))
             ORDER BY price {order_dir}, created_at ASC
             LIMIT 1"
        );

        sqlx::query_as::<_, Self>(&query)
            .bind(symbol)
            .bind(counter_side)
            .bind(limit_price)
            .bind(excluding)
            .fetch_optional(&mut **pool_or_tx)
            .await
    }

    pub async fn mark_filled(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE orders SET status = 'filled', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn mark_cancelled(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "UPDATE orders SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        status_filter: Option<OrderStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match status_filter {
            Some(status) => {
                sqlx::query_as::<_, Self>(
                    "SELECT * FROM orders WHERE user_id = $1 AND status = $2 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .bind(status)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Self>(
                    "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn orderbook(
        pool: &PgPool,
        symbol: &str,
    ) -> Result<(Vec<Self>, Vec<Self>), sqlx::Error> {
        let buy_orders = sqlx::query_as::<_, Self>(
            "SELECT * FROM orders WHERE symbol = $1 AND side = 'buy' AND status = 'open'
             ORDER BY price DESC, created_at ASC",
        )
        .bind(symbol)
        .fetch_all(pool)
        .await?;

        let sell_orders = sqlx::query_as::<_, Self>(
            "SELECT * FROM orders WHERE symbol = $1 AND side = 'sell' AND status = 'open'
             ORDER BY price ASC, created_at ASC",
        )
        .bind(symbol)
        .fetch_all(pool)
        .await?;

        Ok((buy_orders, sell_orders))
    }
}

//! Background reconciliation task. The teacher's scheduler destructively
//! truncates trades/ledger at midnight; this engine's invariants (§8) must
//! hold forever, so the adapted version instead periodically re-checks them
//! against live data and only warns — it never mutates state.

use sqlx::PgPool;
use std::time::Duration;

const CHECK_INTERVAL: Duration = Duration::from_secs(3600);

pub fn spawn_invariant_check_task(pool: PgPool) {
    tokio::spawn(async move {
        tracing::info!("invariant reconciliation task started, checking every hour");

        loop {
            tokio::time::sleep(CHECK_INTERVAL).await;

            if let Err(e) = check_invariants(&pool).await {
                tracing::error!("invariant check failed to run: {}", e);
            }
        }
    });
}

async fn check_invariants(pool: &PgPool) -> Result<(), sqlx::Error> {
    let negative_balances: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE balance < 0")
            .fetch_one(pool)
            .await?;
    if negative_balances > 0 {
        tracing::warn!(count = negative_balances, "users with negative balance detected");
    }

    let bad_assets: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assets WHERE locked_amount < 0 OR locked_amount > amount",
    )
    .fetch_one(pool)
    .await?;
    if bad_assets > 0 {
        tracing::warn!(count = bad_assets, "asset rows violating locked_amount <= amount");
    }

    let stale_open_orders: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders WHERE status = 'open' AND created_at < NOW() - INTERVAL '30 days'",
    )
    .fetch_one(pool)
    .await?;
    if stale_open_orders > 0 {
        tracing::info!(count = stale_open_orders, "open orders older than 30 days");
    }

    Ok(())
}

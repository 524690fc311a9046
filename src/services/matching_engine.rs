//! §4.6 MatchingEngine. `process` runs inside the transaction that
//! `order_service::create_order` already opened around the order insert,
//! so any failure here rolls back that insert and its fund/asset lock too
//! — there is no nested transaction, per the "do not open a nested one"
//! design note.

use rust_decimal_macros::dec;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Order, OrderStatus, Side, Symbol, Trade};
use crate::money;
use crate::services::{asset_service, balance_service};

pub const COMMISSION_RATE: rust_decimal::Decimal = dec!(0.015);

pub struct Settlement {
    pub trade: Trade,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
}

/// Re-reads `new_order` under lock, finds the best compatible counter-order
/// if any, and settles it atomically. Returns `None` if the order stays
/// Open (no candidate, or it was already matched by the time this ran).
pub async fn process(
    tx: &mut Transaction<'_, Postgres>,
    new_order_id: Uuid,
) -> Result<Option<Settlement>, EngineError> {
    let new_order = Order::lock_for_update(tx, new_order_id).await?;
    if new_order.status != OrderStatus::Open {
        return Ok(None);
    }

    let counter_side = new_order.side.opposite();
    let mut excluded: Vec<Uuid> = Vec::new();

    loop {
        let candidate =
            Order::best_candidate(tx, &new_order.symbol, counter_side, new_order.price, &excluded).await?;

        let Some(candidate) = candidate else {
            return Ok(None);
        };

        let (locked_a, locked_b) = Order::lock_two_for_update(tx, new_order.id, candidate.id).await?;
        let (locked_new, locked_candidate) = if locked_a.id == new_order.id {
            (locked_a, locked_b)
        } else {
            (locked_b, locked_a)
        };

        if locked_candidate.status != OrderStatus::Open {
            // A concurrent transaction filled or cancelled it between our
            // read and our lock acquisition; try the next-best candidate.
            excluded.push(locked_candidate.id);
            continue;
        }

        let (buy_order, sell_order) = match locked_new.side {
            Side::Buy => (locked_new, locked_candidate),
            Side::Sell => (locked_candidate, locked_new),
        };

        if buy_order.amount != sell_order.amount {
            return Err(EngineError::UnsupportedPartialMatch {
                buy_amount: buy_order.amount,
                sell_amount: sell_order.amount,
            });
        }

        return settle(tx, buy_order, sell_order).await.map(Some);
    }
}

async fn settle(
    tx: &mut Transaction<'_, Postgres>,
    buy_order: Order,
    sell_order: Order,
) -> Result<Settlement, EngineError> {
    let symbol: Symbol = buy_order.symbol.parse()?;
    let match_price = sell_order.price;
    let amount = buy_order.amount;
    let volume = money::checked_mul(match_price, amount)?;
    let commission = money::checked_mul(volume, COMMISSION_RATE)?;
    let seller_proceeds = volume - commission;

    // The buyer locked `buy_order.price * amount` at placement, which can
    // exceed `volume` when the order clears below its limit price. Release
    // exactly what was locked, not `volume`, so a price-improved buyer's net
    // delta is `-volume` rather than leaking the improvement into the void.
    let locked_cost = money::checked_mul(buy_order.price, amount)?;

    asset_service::transfer_assets(tx, sell_order.user_id, buy_order.user_id, symbol, amount).await?;
    balance_service::release_funds(tx, buy_order.user_id, locked_cost).await?;
    balance_service::transfer_usd(tx, buy_order.user_id, sell_order.user_id, seller_proceeds).await?;
    balance_service::deduct_commission(tx, buy_order.user_id, commission).await?;

    Order::mark_filled(tx, buy_order.id).await?;
    Order::mark_filled(tx, sell_order.id).await?;

    let trade = Trade::insert(
        tx,
        buy_order.id,
        sell_order.id,
        buy_order.user_id,
        sell_order.user_id,
        &buy_order.symbol,
        match_price,
        amount,
        volume,
        commission,
    )
    .await?;

    Ok(Settlement { trade, buyer_id: buy_order.user_id, seller_id: sell_order.user_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn commission_rate_matches_spec() {
        assert_eq!(COMMISSION_RATE, dec!(0.015));
    }

    #[test]
    fn s1_settlement_math() {
        let volume = money::checked_mul(dec!(50000), dec!(1)).unwrap();
        let commission = money::checked_mul(volume, COMMISSION_RATE).unwrap();
        assert_eq!(volume, dec!(50000));
        assert_eq!(commission, dec!(750));
        assert_eq!(volume - commission, dec!(49250));
    }
}

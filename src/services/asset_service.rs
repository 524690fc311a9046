//! §4.4 AssetService: lock / release / transfer / credit per-symbol
//! holdings, against a caller-supplied transaction handle.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::{Asset, Symbol};
use crate::money;

pub async fn lock_assets(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    symbol: Symbol,
    amount: Decimal,
) -> Result<Asset, EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("lock amount must be positive".into()));
    }
    let asset = Asset::get_or_create_for_update(tx, user_id, symbol).await?;
    let available = asset.available();
    if available < amount {
        return Err(EngineError::InsufficientAssets { available, required: amount });
    }
    Ok(Asset::update(tx, user_id, symbol, asset.amount, asset.locked_amount + amount).await?)
}

pub async fn release_assets(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    symbol: Symbol,
    amount: Decimal,
) -> Result<Asset, EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("release amount must be positive".into()));
    }
    let asset = Asset::get_or_create_for_update(tx, user_id, symbol).await?;
    if asset.locked_amount < amount {
        return Err(EngineError::InsufficientLocked { locked: asset.locked_amount, required: amount });
    }
    Ok(Asset::update(tx, user_id, symbol, asset.amount, asset.locked_amount - amount).await?)
}

/// Moves `amount` out of the seller's locked pool (decreasing both total
/// and locked) and into the buyer's total. The seller's *available*
/// portion never participates: it was committed at order-placement time.
pub async fn transfer_assets(
    tx: &mut Transaction<'_, Postgres>,
    from: Uuid,
    to: Uuid,
    symbol: Symbol,
    amount: Decimal,
) -> Result<(), EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("transfer amount must be positive".into()));
    }
    let (first, second) = Asset::lock_two_for_update(tx, from, symbol, to, symbol).await?;
    let (from_asset, to_asset) = if first.user_id == from { (first, second) } else { (second, first) };

    if from_asset.locked_amount < amount {
        return Err(EngineError::InsufficientLocked { locked: from_asset.locked_amount, required: amount });
    }

    Asset::update(
        tx,
        from,
        symbol,
        from_asset.amount - amount,
        from_asset.locked_amount - amount,
    )
    .await?;

    Asset::update(tx, to, symbol, to_asset.amount + amount, to_asset.locked_amount).await?;

    Ok(())
}

/// Adds to `amount` without touching `locked_amount`. Used only for
/// initial funding at registration; never invoked mid-trade.
pub async fn credit(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    symbol: Symbol,
    amount: Decimal,
) -> Result<Asset, EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("credit amount must be positive".into()));
    }
    let asset = Asset::get_or_create_for_update(tx, user_id, symbol).await?;
    Ok(Asset::update(tx, user_id, symbol, asset.amount + amount, asset.locked_amount).await?)
}

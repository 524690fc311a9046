//! §4.3 BalanceService: lock / release / deduct / transfer USD, always
//! against a transaction handle the caller already opened. No function
//! here opens its own transaction — that's the OrderService/MatchingEngine's
//! job, per the "explicit handle threading" design note.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::models::User;
use crate::money;

pub async fn get_balance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Decimal, EngineError> {
    let user = User::lock_for_update(tx, user_id).await?;
    Ok(user.balance)
}

pub async fn lock_funds(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
) -> Result<User, EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("lock amount must be positive".into()));
    }
    let user = User::lock_for_update(tx, user_id).await?;
    if user.balance < amount {
        return Err(EngineError::InsufficientBalance { available: user.balance, required: amount });
    }
    let new_balance = user.balance - amount;
    Ok(User::set_balance(tx, user_id, new_balance).await?)
}

pub async fn release_funds(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
) -> Result<User, EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("release amount must be positive".into()));
    }
    let user = User::lock_for_update(tx, user_id).await?;
    let new_balance = user.balance + amount;
    Ok(User::set_balance(tx, user_id, new_balance).await?)
}

/// Locks both users in ascending id order, then moves `amount` from `from`
/// to `to`. Used by the matching engine to pay the seller.
pub async fn transfer_usd(
    tx: &mut Transaction<'_, Postgres>,
    from: Uuid,
    to: Uuid,
    amount: Decimal,
) -> Result<(), EngineError> {
    if !money::is_positive(amount) {
        return Err(EngineError::Validation("transfer amount must be positive".into()));
    }
    let (first, second) = User::lock_two_for_update(tx, from, to).await?;
    let (from_user, to_user) = if first.id == from { (first, second) } else { (second, first) };

    if from_user.balance < amount {
        return Err(EngineError::InsufficientBalance { available: from_user.balance, required: amount });
    }

    User::set_balance(tx, from_user.id, from_user.balance - amount).await?;
    User::set_balance(tx, to_user.id, to_user.balance + amount).await?;
    Ok(())
}

/// A sink with no matching release: the commission leaves the buyer's
/// balance permanently (§4.6 step 7, §8 property 2 treats it as tracked
/// system revenue, not a user-recoverable lock).
pub async fn deduct_commission(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: Decimal,
) -> Result<User, EngineError> {
    lock_funds(tx, user_id, amount).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_amount_is_not_positive() {
        assert!(!money::is_positive(dec!(0)));
    }
}

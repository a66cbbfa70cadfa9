//! Stock ledger - the authoritative per-snack quantity counter.
//!
//! Reservations are a single conditional `UPDATE` that only succeeds while enough units
//! remain (`quantity_in_stock >= requested`). Two concurrent carts racing for the last unit
//! therefore cannot both win, whatever the isolation level of the store. Both operations
//! are generic over [`ConnectionTrait`] so the order builder can run them on its open
//! transaction; a failed cart rolls back every reservation it already made.

use crate::{
    entities::{Snack, snack},
    errors::{Error, Result},
};
use sea_orm::{prelude::*, sea_query::Expr};
use tracing::{debug, error};

/// Atomically takes `quantity` units of a snack out of stock.
///
/// Returns the new stock level.
///
/// # Errors
/// - [`Error::Validation`] if `quantity` is not positive
/// - [`Error::NotFound`] if the snack does not exist
/// - [`Error::InsufficientStock`] if fewer than `quantity` units are available
/// - [`Error::Internal`] if the counter is found negative afterwards
pub async fn reserve<C>(db: &C, snack_id: i64, quantity: i32) -> Result<i32>
where
    C: ConnectionTrait,
{
    if quantity < 1 {
        return Err(Error::validation("Quantity must be at least 1"));
    }

    let result = Snack::update_many()
        .col_expr(
            snack::Column::QuantityInStock,
            Expr::col(snack::Column::QuantityInStock).sub(quantity),
        )
        .filter(snack::Column::Id.eq(snack_id))
        .filter(snack::Column::QuantityInStock.gte(quantity))
        .exec(db)
        .await?;

    let current = Snack::find_by_id(snack_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("snack", snack_id))?;

    if result.rows_affected == 0 {
        return Err(Error::InsufficientStock {
            snack: current.name,
            requested: quantity,
            available: current.quantity_in_stock,
        });
    }

    if current.quantity_in_stock < 0 {
        error!(
            "Stock of snack {} went negative ({})",
            snack_id, current.quantity_in_stock
        );
        return Err(Error::Internal {
            message: format!("stock of snack {snack_id} is negative"),
        });
    }

    debug!(
        "Reserved {} unit(s) of '{}', {} left",
        quantity, current.name, current.quantity_in_stock
    );
    Ok(current.quantity_in_stock)
}

/// Atomically returns `quantity` units of a snack to stock.
///
/// Releasing is not idempotent: callers must release each reservation exactly once.
///
/// Returns the new stock level.
pub async fn release<C>(db: &C, snack_id: i64, quantity: i32) -> Result<i32>
where
    C: ConnectionTrait,
{
    if quantity < 1 {
        return Err(Error::validation("Quantity must be at least 1"));
    }

    let result = Snack::update_many()
        .col_expr(
            snack::Column::QuantityInStock,
            Expr::col(snack::Column::QuantityInStock).add(quantity),
        )
        .filter(snack::Column::Id.eq(snack_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found("snack", snack_id));
    }

    let current = Snack::find_by_id(snack_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("snack", snack_id))?;

    debug!(
        "Released {} unit(s) of '{}', {} in stock",
        quantity, current.name, current.quantity_in_stock
    );
    Ok(current.quantity_in_stock)
}

/// Current stock level of a snack.
pub async fn stock_level<C>(db: &C, snack_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    Snack::find_by_id(snack_id)
        .one(db)
        .await?
        .map(|s| s.quantity_in_stock)
        .ok_or_else(|| Error::not_found("snack", snack_id))
}

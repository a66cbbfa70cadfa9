//! Choice-group renumbering.
//!
//! Single-choice groups on a dish are numbered 1..=max with no gaps, counting only
//! compositions whose ingredient is active. Whenever a composition leaves group `G`
//! (deleted, moved to another group, or its ingredient soft-deleted),
//! [`renumber_after_removal`] closes the gap. Callers run it inside the same database
//! transaction as the change that vacated the group.

use crate::{
    core::active::active_compositions,
    entities::composition,
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Highest single-choice group number among the dish's active compositions (0 if none).
pub async fn max_group_number<C>(db: &C, dish_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    let max = active_compositions()
        .filter(composition::Column::DishId.eq(dish_id))
        .all(db)
        .await?
        .iter()
        .map(|c| c.choice_group_number)
        .max()
        .unwrap_or(0);
    Ok(max.max(0))
}

/// Checks a caller-supplied group number against the current maximum.
///
/// Valid values are 0 (multiple choice) up to `current_max + 1` (open a new group);
/// anything beyond would leave a gap.
pub fn validate_group_number(requested: i32, current_max: i32) -> Result<()> {
    if requested < 0 {
        return Err(Error::validation(
            "The choice group number must be zero or greater",
        ));
    }
    if requested > current_max + 1 {
        return Err(Error::validation(format!(
            "The choice group number {requested} exceeds the allowed maximum {}",
            current_max + 1
        )));
    }
    Ok(())
}

/// Closes the gap left by a composition that vacated group `removed`.
///
/// Scans the dish's active compositions with a group number `>= removed` in ascending
/// order and decrements each one, stopping at the first composition that still holds
/// `removed` (the group is still populated, so nothing shifts). Group 0 is never touched.
///
/// Returns the number of compositions that were renumbered.
pub async fn renumber_after_removal<C>(db: &C, dish_id: i64, removed: i32) -> Result<u64>
where
    C: ConnectionTrait,
{
    if removed <= 0 {
        return Ok(0);
    }

    let affected = active_compositions()
        .filter(composition::Column::DishId.eq(dish_id))
        .filter(composition::Column::ChoiceGroupNumber.gte(removed))
        .order_by_asc(composition::Column::ChoiceGroupNumber)
        .order_by_asc(composition::Column::Id)
        .all(db)
        .await?;

    let mut renumbered = 0;
    for target in affected {
        if target.choice_group_number == removed {
            break;
        }

        let next = target.choice_group_number - 1;
        let mut active: composition::ActiveModel = target.into();
        active.choice_group_number = Set(next);
        active.update(db).await?;
        renumbered += 1;
    }

    debug!(
        "Renumbered {} composition(s) of dish {} after group {} was vacated",
        renumbered, dish_id, removed
    );
    Ok(renumbered)
}

/// Sorted, de-duplicated positive group numbers of the dish's active compositions.
pub async fn group_numbers<C>(db: &C, dish_id: i64) -> Result<Vec<i32>>
where
    C: ConnectionTrait,
{
    let mut groups: Vec<i32> = active_compositions()
        .filter(composition::Column::DishId.eq(dish_id))
        .filter(composition::Column::ChoiceGroupNumber.gt(0))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.choice_group_number)
        .collect();
    groups.sort_unstable();
    groups.dedup();
    Ok(groups)
}

/// Whether `groups` (sorted, de-duplicated) is exactly `1..=len`.
#[must_use]
pub fn is_dense(groups: &[i32]) -> bool {
    groups
        .iter()
        .zip(1..)
        .all(|(group, expected)| *group == expected)
}

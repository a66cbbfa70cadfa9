//! Active-row scoping for soft-deleted tables.
//!
//! Ingredients, snacks, snack categories and users are never removed; they get a
//! `deletion_date` instead. Every lookup that feeds the catalog or the order builder goes
//! through [`SoftDelete::find_active`] (or the joined scopes below) so the "not deleted"
//! predicate lives in one place. [`SoftDelete::find_including_deleted`] is the explicit
//! escape hatch for history views.

use crate::entities::{composition, ingredient, snack, snack_category, user};
use sea_orm::{JoinType, QueryFilter, QuerySelect, RelationTrait, Select, prelude::*};

/// An entity whose rows are retired through a nullable deletion timestamp.
pub trait SoftDelete: EntityTrait {
    /// The nullable timestamp column marking a row as deleted.
    fn deletion_column() -> Self::Column;

    /// Rows that have not been soft-deleted.
    #[must_use]
    fn find_active() -> Select<Self> {
        Self::find().filter(Self::deletion_column().is_null())
    }

    /// All rows, deleted or not.
    #[must_use]
    fn find_including_deleted() -> Select<Self> {
        Self::find()
    }
}

impl SoftDelete for ingredient::Entity {
    fn deletion_column() -> Self::Column {
        ingredient::Column::DeletionDate
    }
}

impl SoftDelete for snack::Entity {
    fn deletion_column() -> Self::Column {
        snack::Column::DeletionDate
    }
}

impl SoftDelete for snack_category::Entity {
    fn deletion_column() -> Self::Column {
        snack_category::Column::DeletionDate
    }
}

impl SoftDelete for user::Entity {
    fn deletion_column() -> Self::Column {
        user::Column::DeletionDate
    }
}

/// Active snacks whose category is active too.
#[must_use]
pub fn active_snacks() -> Select<snack::Entity> {
    snack::Entity::find_active()
        .join(JoinType::InnerJoin, snack::Relation::Category.def())
        .filter(snack_category::Column::DeletionDate.is_null())
}

/// Compositions whose ingredient is active.
#[must_use]
pub fn active_compositions() -> Select<composition::Entity> {
    composition::Entity::find()
        .join(JoinType::InnerJoin, composition::Relation::Ingredient.def())
        .filter(ingredient::Column::DeletionDate.is_null())
}

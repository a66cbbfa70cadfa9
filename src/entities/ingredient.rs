//! Ingredient entity - An add-on that can be linked to any number of dishes.
//!
//! Ingredients are soft-deleted through `deletion_date` so that historical order lines
//! keep pointing at a real row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    /// Unique identifier for the ingredient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name, unique among active ingredients
    pub name: String,
    /// Extra charge per unit; `None` means the ingredient is free
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub additional_charge: Option<Decimal>,
    /// Soft delete marker
    pub deletion_date: Option<DateTimeUtc>,
}

/// Defines relationships between Ingredient and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One ingredient can be linked to many dishes
    #[sea_orm(has_many = "super::composition::Entity")]
    Compositions,
}

impl Related<super::composition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Compositions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

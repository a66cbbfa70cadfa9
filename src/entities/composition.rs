//! Composition entity - Links an ingredient to a dish.
//!
//! `choice_group_number` is 0 for freely combinable ("multiple choice") ingredients.
//! A positive number puts the ingredient into a single-choice group: at most one
//! ingredient of the group may be picked per order. Positive numbers are kept dense
//! (1..=max) per dish by [`crate::core::choice_group`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Composition database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "compositions")]
pub struct Model {
    /// Unique identifier for the link
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Dish side of the link
    pub dish_id: i64,
    /// Ingredient side of the link
    pub ingredient_id: i64,
    /// 0 = multiple choice, N > 0 = member of single-choice group N
    pub choice_group_number: i32,
}

/// Defines relationships between Composition and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each link belongs to one dish
    #[sea_orm(
        belongs_to = "super::dish::Entity",
        from = "Column::DishId",
        to = "super::dish::Column::Id"
    )]
    Dish,
    /// Each link belongs to one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<super::dish::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dish.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

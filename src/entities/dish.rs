//! Dish entity - The fixed lunch dish served on one weekday.
//!
//! There is at most one dish per weekday (`day` is unique, Monday = 1). Dishes are seeded
//! once and then edited in place week after week; they are never deleted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dish database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dishes")]
pub struct Model {
    /// Unique identifier for the dish
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Weekday number, 1 (Monday) to 7 (Sunday)
    #[sea_orm(unique)]
    pub day: i32,
    /// Base price charged once per order that includes this dish
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub price: Decimal,
    /// Time of day from which the dish can be ordered
    pub initial_deadline: Option<chrono::NaiveTime>,
    /// Time of day after which the dish can no longer be ordered
    pub deadline: Option<chrono::NaiveTime>,
    /// Free-form description shown on the menu
    pub description: Option<String>,
    /// Path of the dish picture
    pub path_img: Option<String>,
}

/// Defines relationships between Dish and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One dish is composed of many ingredient links
    #[sea_orm(has_many = "super::composition::Entity")]
    Compositions,
}

impl Related<super::composition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Compositions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

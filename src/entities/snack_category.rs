//! Snack category entity - Groups snacks on the counter menu.
//!
//! Active categories carry a dense `position_order` (1..=N) used for display.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snack category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "snack_categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name, unique among active categories
    pub name: String,
    /// Display position, 1-based and dense among active categories
    pub position_order: i32,
    /// Path of the category picture
    pub path_img: Option<String>,
    /// Soft delete marker
    pub deletion_date: Option<DateTimeUtc>,
}

/// Defines relationships between `SnackCategory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category holds many snacks
    #[sea_orm(has_many = "super::snack::Entity")]
    Snacks,
    /// One category has one marketing description
    #[sea_orm(has_one = "super::category_description::Entity")]
    Description,
}

impl Related<super::snack::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snacks.def()
    }
}

impl Related<super::category_description::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Description.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Snack entity - A discrete item sold from finite stock.
//!
//! `quantity_in_stock` is the stock ledger counter; it is only ever changed through
//! [`crate::core::stock`] so that it never goes negative.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snack database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "snacks")]
pub struct Model {
    /// Unique identifier for the snack
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name, unique among active snacks of active categories
    pub name: String,
    /// Units available for reservation
    pub quantity_in_stock: i32,
    /// Unit price
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub price: Decimal,
    /// Free-form description
    pub description: Option<String>,
    /// Path of the snack picture
    pub path_img: Option<String>,
    /// Soft delete marker
    pub deletion_date: Option<DateTimeUtc>,
    /// Owning category
    pub category_id: i64,
}

/// Defines relationships between Snack and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each snack belongs to one category
    #[sea_orm(
        belongs_to = "super::snack_category::Entity",
        from = "Column::CategoryId",
        to = "super::snack_category::Column::Id"
    )]
    Category,
}

impl Related<super::snack_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

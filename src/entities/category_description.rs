//! Category description entity - Marketing copy attached one-to-one to a snack category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category description database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_descriptions")]
pub struct Model {
    /// The owning category; doubles as primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: i64,
    /// Headline
    pub title: String,
    /// Body text
    pub text: String,
    /// Optional illustration
    pub illustration_url: Option<String>,
}

/// Defines relationships between `CategoryDescription` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each description belongs to one category
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

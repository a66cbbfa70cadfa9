//! Buy ingredient entity - A lunch line item of an order.
//!
//! The line records the dish and ingredient of the composition that was picked rather
//! than the composition row itself: compositions are hard-deleted when staff edit a
//! dish, while dishes and ingredients are kept for history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lunch line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "buy_ingredients")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning order
    pub order_id: i64,
    /// Dish of the picked composition
    pub dish_id: i64,
    /// Ingredient of the picked composition
    pub ingredient_id: i64,
    /// Extra units; `None` for plain inclusion without a quantity
    pub quantity: Option<i32>,
    /// Dish base price at order time
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub price_to_purchase_dish: Decimal,
    /// Ingredient unit charge at order time (zero when free)
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub price_to_purchase_ingredient: Decimal,
}

/// Defines relationships between `BuyIngredient` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// The dish side of the picked composition
    #[sea_orm(
        belongs_to = "super::dish::Entity",
        from = "Column::DishId",
        to = "super::dish::Column::Id"
    )]
    Dish,
    /// The ingredient side of the picked composition
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

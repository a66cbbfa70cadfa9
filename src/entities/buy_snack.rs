//! Buy snack entity - A snack line item of an order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snack line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "buy_snacks")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning order
    pub order_id: i64,
    /// Purchased snack
    pub snack_id: i64,
    /// Units reserved from stock, at least 1
    pub quantity: i32,
    /// Unit price at order time
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub price_to_purchase: Decimal,
}

/// Defines relationships between `BuySnack` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// Each line references one snack
    #[sea_orm(
        belongs_to = "super::snack::Entity",
        from = "Column::SnackId",
        to = "super::snack::Column::Id"
    )]
    Snack,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::snack::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snack.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Order entity - The header of a submitted cart.
//!
//! Totals are computed once at submission from price snapshots and never recomputed:
//! `amount_due == amount_snacks + amount_lunch`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Internal identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque identifier exposed to clients
    #[sea_orm(unique)]
    pub public_id: Uuid,
    /// The user the order belongs to (and who pays)
    pub user_id: i64,
    /// The user who submitted it; differs from `user_id` when staff orders for someone
    pub creator_id: i64,
    /// Submission time
    pub creation_date: DateTimeUtc,
    /// Sum of snack line totals
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub amount_snacks: Decimal,
    /// Dish base price plus ingredient charges, zero without lunch
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub amount_lunch: Decimal,
    /// `amount_snacks + amount_lunch`
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    pub amount_due: Decimal,
    /// Set by staff once the order was handed over
    pub fulfilled: bool,
    /// When staff recorded the payment; `None` while unpaid
    pub final_payment: Option<DateTimeUtc>,
    /// Hidden orders drop out of the staff queues
    pub hidden: bool,
    /// Free-form note
    pub description: Option<String>,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The owner of the order
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// The user who submitted the order
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatorId",
        to = "super::user::Column::Id"
    )]
    Creator,
    /// Snack line items
    #[sea_orm(has_many = "super::buy_snack::Entity")]
    BuySnacks,
    /// Lunch line items
    #[sea_orm(has_many = "super::buy_ingredient::Entity")]
    BuyIngredients,
}

impl Related<super::buy_snack::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuySnacks.def()
    }
}

impl Related<super::buy_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuyIngredients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

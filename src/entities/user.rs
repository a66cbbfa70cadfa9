//! User entity - Employees and clients who place orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique among active users
    pub name: String,
    /// Contact address
    #[sea_orm(unique)]
    pub email: String,
    /// Staff members manage the catalog and fulfil orders
    pub is_staff: bool,
    /// Soft delete marker
    pub deletion_date: Option<DateTimeUtc>,
}

/// `User` is only referenced from other tables
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

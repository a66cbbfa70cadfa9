//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite uniqueness that the entity
//! attributes cannot express (dish × ingredient, order × snack, order × dish × ingredient)
//! is added as explicit unique indexes.

use crate::entities::{
    BuyIngredient, BuySnack, CategoryDescription, Composition, Dish, Ingredient, Order, Snack,
    SnackCategory, User, buy_ingredient, buy_snack, composition,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/cafeteria.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_dir(&database_url)?;
    info!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates the parent directory of a file-backed `SQLite` URL.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Creates all tables and unique indexes if they do not exist yet.
///
/// Tables are created parents-first so that the foreign keys generated from the
/// `belongs_to` relations always point at an existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Dish),
        schema.create_table_from_entity(Ingredient),
        schema.create_table_from_entity(Composition),
        schema.create_table_from_entity(SnackCategory),
        schema.create_table_from_entity(CategoryDescription),
        schema.create_table_from_entity(Snack),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(BuySnack),
        schema.create_table_from_entity(BuyIngredient),
    ];

    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    for index in unique_indexes() {
        db.execute(builder.build(&index)).await?;
    }

    debug!("Schema is up to date");
    Ok(())
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        unique_index(
            "idx_compositions_dish_ingredient",
            Composition,
            &[composition::Column::DishId, composition::Column::IngredientId],
        ),
        unique_index(
            "idx_buy_snacks_order_snack",
            BuySnack,
            &[buy_snack::Column::OrderId, buy_snack::Column::SnackId],
        ),
        unique_index(
            "idx_buy_ingredients_order_dish_ingredient",
            BuyIngredient,
            &[
                buy_ingredient::Column::OrderId,
                buy_ingredient::Column::DishId,
                buy_ingredient::Column::IngredientId,
            ],
        ),
    ]
}

fn unique_index<E: EntityTrait>(name: &str, entity: E, columns: &[E::Column]) -> IndexCreateStatement {
    let mut index = Index::create();
    index.name(name).table(entity).unique().if_not_exists();
    for column in columns {
        index.col(*column);
    }
    index
}

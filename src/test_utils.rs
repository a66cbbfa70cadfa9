//! Shared test utilities for the cafeteria core.
//!
//! This module provides common helper functions for setting up test databases
//! and creating catalog fixtures with sensible defaults.

use crate::{
    config::menu::DishSeed,
    core::{catalog, user},
    entities::{composition, dish, ingredient, snack, snack_category},
    errors::Result,
    live::{Publisher, Topic},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, prelude::Decimal};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in the temp directory.
///
/// Unlike `sqlite::memory:`, this uses the default connection pool, so concurrent
/// transactions really run on separate connections. The caller removes the file.
pub async fn setup_file_test_db() -> Result<(DatabaseConnection, PathBuf)> {
    let file_name = format!("cafeteria-test-{}.sqlite", uuid::Uuid::new_v4());
    let path = std::env::temp_dir().join(file_name);
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = sea_orm::Database::connect(&url).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Creates a dish for `day`.
///
/// # Defaults
/// * price: 10.00
/// * no time window, no description
pub async fn create_test_dish(db: &DatabaseConnection, day: i32) -> Result<dish::Model> {
    let seed = DishSeed {
        day,
        price: Decimal::new(1000, 2),
        initial_deadline: None,
        deadline: None,
        description: None,
    };
    catalog::create_dish(db, &seed).await
}

/// Sets up a database with the Monday dish.
/// Returns (db, dish) for lunch-related tests.
pub async fn setup_with_dish() -> Result<(DatabaseConnection, dish::Model)> {
    let db = setup_test_db().await?;
    let dish = create_test_dish(&db, 1).await?;
    Ok((db, dish))
}

/// Inserts an active ingredient directly, bypassing catalog validation.
pub async fn create_test_ingredient(
    db: &DatabaseConnection,
    name: &str,
    additional_charge: Option<Decimal>,
) -> Result<ingredient::Model> {
    let ingredient = ingredient::ActiveModel {
        name: Set(name.to_string()),
        additional_charge: Set(additional_charge),
        deletion_date: Set(None),
        ..Default::default()
    };
    Ok(ingredient.insert(db).await?)
}

/// Creates a charge-free ingredient and links it to `dish` in `group`.
///
/// Group numbers are not checked, so tests can build gapped layouts on purpose.
pub async fn link_test_ingredient(
    db: &DatabaseConnection,
    dish: &dish::Model,
    name: &str,
    group: i32,
) -> Result<composition::Model> {
    let ingredient = create_test_ingredient(db, name, None).await?;
    link_existing_ingredient(db, dish, &ingredient, group).await
}

/// Links an existing ingredient to `dish` in `group` without validation.
pub async fn link_existing_ingredient(
    db: &DatabaseConnection,
    dish: &dish::Model,
    ingredient: &ingredient::Model,
    group: i32,
) -> Result<composition::Model> {
    let composition = composition::ActiveModel {
        dish_id: Set(dish.id),
        ingredient_id: Set(ingredient.id),
        choice_group_number: Set(group),
        ..Default::default()
    };
    Ok(composition.insert(db).await?)
}

/// Inserts an active snack category at `position`.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
    position: i32,
) -> Result<snack_category::Model> {
    let category = snack_category::ActiveModel {
        name: Set(name.to_string()),
        position_order: Set(position),
        path_img: Set(None),
        deletion_date: Set(None),
        ..Default::default()
    };
    Ok(category.insert(db).await?)
}

/// Inserts an active snack into `category`.
pub async fn create_test_snack(
    db: &DatabaseConnection,
    category: &snack_category::Model,
    name: &str,
    stock: i32,
    price: Decimal,
) -> Result<snack::Model> {
    let snack = snack::ActiveModel {
        name: Set(name.to_string()),
        quantity_in_stock: Set(stock),
        price: Set(price),
        description: Set(None),
        path_img: Set(None),
        deletion_date: Set(None),
        category_id: Set(category.id),
        ..Default::default()
    };
    Ok(snack.insert(db).await?)
}

/// Sets up a database with one snack in a "Drinks" category.
/// Returns (db, category, snack). The snack costs 3.50.
pub async fn setup_with_snack(
    name: &str,
    stock: i32,
) -> Result<(DatabaseConnection, snack_category::Model, snack::Model)> {
    let db = setup_test_db().await?;
    let category = create_test_category(&db, "Drinks", 1).await?;
    let snack = create_test_snack(&db, &category, name, stock, Decimal::new(350, 2)).await?;
    Ok((db, category, snack))
}

/// Creates a user with an email derived from the name.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    is_staff: bool,
) -> Result<crate::entities::user::Model> {
    user::create_user(db, name, &format!("{name}@example.com"), is_staff).await
}

/// Publisher that records every call for later assertions.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<Vec<Topic>>>,
}

impl RecordingPublisher {
    /// Topics of every publish call so far, in call order.
    pub fn calls(&self) -> Vec<Vec<Topic>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, topics: &[Topic]) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(topics.to_vec());
    }
}

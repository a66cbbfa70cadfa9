//! Weekday dish seed configuration.
//!
//! The dishes served each weekday are seeded once, on first start, from the
//! `[[dishes]]` entries of a TOML file. Without a file the five weekday dishes
//! (Monday to Friday) are created at a base price of 10.00.

use crate::errors::{Error, Result};
use sea_orm::prelude::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the menu config file
#[derive(Debug, Deserialize)]
pub struct MenuConfig {
    /// Dishes to create when the dish table is empty
    #[serde(default = "default_dishes")]
    pub dishes: Vec<DishSeed>,
}

/// Seed values for a single weekday dish
#[derive(Debug, Deserialize, Clone)]
pub struct DishSeed {
    /// Weekday, Monday = 1
    pub day: i32,
    /// Base price of the dish
    pub price: Decimal,
    /// Opening time for lunch orders
    #[serde(default)]
    pub initial_deadline: Option<chrono::NaiveTime>,
    /// Closing time for lunch orders
    #[serde(default)]
    pub deadline: Option<chrono::NaiveTime>,
    /// Menu text
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            dishes: default_dishes(),
        }
    }
}

fn default_dishes() -> Vec<DishSeed> {
    (1..=5)
        .map(|day| DishSeed {
            day,
            price: Decimal::new(1000, 2),
            initial_deadline: None,
            deadline: None,
            description: None,
        })
        .collect()
}

/// Loads the menu configuration from a TOML file.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A seed has a day outside 1..=7 or a non-positive price
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MenuConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read menu config {}: {e}", path.as_ref().display()),
    })?;

    parse_config(&contents)
}

/// Parses and validates a menu configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<MenuConfig> {
    let config: MenuConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse menu config: {e}"),
    })?;

    for seed in &config.dishes {
        if !(1..=7).contains(&seed.day) {
            return Err(Error::Config {
                message: format!("Dish day {} is outside 1..=7", seed.day),
            });
        }
        if seed.price <= Decimal::ZERO {
            return Err(Error::Config {
                message: format!("Dish price for day {} must be positive", seed.day),
            });
        }
    }

    Ok(config)
}

/// Loads the menu configuration from `MENU_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error: the default weekday dishes are used instead.
pub fn load_default_config() -> Result<MenuConfig> {
    let path = std::env::var("MENU_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        tracing::info!("No menu config at {}, using default weekday dishes", path);
        return Ok(MenuConfig::default());
    }
    load_config(path)
}

/// Database configuration and connection management
pub mod database;

/// Weekday dish seed configuration from config.toml
pub mod menu;

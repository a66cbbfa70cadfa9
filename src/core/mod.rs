/// Active-row scoping for soft-deleted tables
pub mod active;
/// Weekday dishes, ingredients and compositions
pub mod catalog;
/// Dense renumbering of single-choice ingredient groups
pub mod choice_group;
/// Order builder, pricing and order lifecycle
pub mod order;
/// Snack categories, snacks and the stock listing
pub mod snack;
/// Atomic snack stock reservations
pub mod stock;
/// User lookups
pub mod user;
/// Response shapes for every read surface
pub mod views;

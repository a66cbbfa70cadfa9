//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod buy_ingredient;
pub mod buy_snack;
pub mod category_description;
pub mod composition;
pub mod dish;
pub mod ingredient;
pub mod order;
pub mod snack;
pub mod snack_category;
pub mod user;

// Re-export specific types to avoid conflicts
pub use buy_ingredient::{Entity as BuyIngredient, Model as BuyIngredientModel};
pub use buy_snack::{Entity as BuySnack, Model as BuySnackModel};
pub use category_description::{
    Entity as CategoryDescription, Model as CategoryDescriptionModel,
};
pub use composition::{Entity as Composition, Model as CompositionModel};
pub use dish::{Entity as Dish, Model as DishModel};
pub use ingredient::{Entity as Ingredient, Model as IngredientModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use snack::{Entity as Snack, Model as SnackModel};
pub use snack_category::{Entity as SnackCategory, Model as SnackCategoryModel};
pub use user::{Entity as User, Model as UserModel};

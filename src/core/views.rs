//! Response shapes.
//!
//! Each external interface gets its own explicit struct instead of a generic model
//! serializer with fields toggled at runtime. The structs are plain data; the queries
//! that fill them live next to the domain logic (`catalog`, `snack`, `order`).

use crate::entities::{category_description, dish, ingredient, order, snack, snack_category};
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::RoundingStrategy;
use sea_orm::prelude::{Decimal, Uuid};
use serde::Serialize;
use std::collections::BTreeMap;

/// Normalizes an amount to two decimal places for display.
#[must_use]
pub fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(2);
    value
}

/// English weekday name for a dish day (Monday = 1).
#[must_use]
pub const fn day_name(day: i32) -> &'static str {
    match day {
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        7 => "Sunday",
        _ => "Unknown",
    }
}

/// An ingredient as listed on a dish or in the ingredient catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientView {
    /// Ingredient name
    pub name: String,
    /// Extra charge on top of the dish price
    pub additional_charge: Option<Decimal>,
}

impl From<&ingredient::Model> for IngredientView {
    fn from(model: &ingredient::Model) -> Self {
        Self {
            name: model.name.clone(),
            additional_charge: model.additional_charge.map(money),
        }
    }
}

/// Ingredients of a dish split by how they may be picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DishIngredients {
    /// Freely combinable add-ons
    pub multiple_choice: Vec<IngredientView>,
    /// Group number to the mutually exclusive ingredients of that group
    pub single_choice: BTreeMap<i32, Vec<IngredientView>>,
}

impl DishIngredients {
    /// Files an ingredient under its choice group (0 = multiple choice).
    pub fn push(&mut self, group: i32, ingredient: IngredientView) {
        if group > 0 {
            self.single_choice.entry(group).or_default().push(ingredient);
        } else {
            self.multiple_choice.push(ingredient);
        }
    }
}

/// A weekday dish with its active ingredients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishView {
    /// Weekday number, Monday = 1
    pub day: i32,
    /// English weekday name
    pub day_name: &'static str,
    /// Base price of the dish
    pub price: Decimal,
    /// Start of the ordering window
    pub initial_deadline: Option<NaiveTime>,
    /// End of the ordering window
    pub deadline: Option<NaiveTime>,
    /// Menu text
    pub description: Option<String>,
    /// Image path
    pub path_img: Option<String>,
    /// Active ingredients by choice group
    pub ingredients: DishIngredients,
}

impl DishView {
    /// Starts a view for `dish` with no ingredients yet.
    #[must_use]
    pub fn new(dish: &dish::Model) -> Self {
        Self {
            day: dish.day,
            day_name: day_name(dish.day),
            price: money(dish.price),
            initial_deadline: dish.initial_deadline,
            deadline: dish.deadline,
            description: dish.description.clone(),
            path_img: dish.path_img.clone(),
            ingredients: DishIngredients::default(),
        }
    }
}

/// A snack as shown in the stock listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnackView {
    /// Snack name
    pub name: String,
    /// Units left
    pub quantity_in_stock: i32,
    /// Unit price
    pub price: Decimal,
    /// Optional blurb
    pub description: Option<String>,
    /// Optional image path
    pub path_img: Option<String>,
}

impl From<&snack::Model> for SnackView {
    fn from(model: &snack::Model) -> Self {
        Self {
            name: model.name.clone(),
            quantity_in_stock: model.quantity_in_stock,
            price: money(model.price),
            description: model.description.clone(),
            path_img: model.path_img.clone(),
        }
    }
}

/// Marketing copy of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionView {
    /// Heading
    pub title: String,
    /// Body copy
    pub text: String,
    /// Optional illustration
    pub illustration_url: Option<String>,
}

impl From<&category_description::Model> for DescriptionView {
    fn from(model: &category_description::Model) -> Self {
        Self {
            title: model.title.clone(),
            text: model.text.clone(),
            illustration_url: model.illustration_url.clone(),
        }
    }
}

/// A category with its active snacks, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    /// Category name
    pub name: String,
    /// Display position, starting at 1
    pub position_order: i32,
    /// Optional image path
    pub path_img: Option<String>,
    /// Marketing copy, if any
    pub description: Option<DescriptionView>,
    /// Active snacks, by name
    pub snacks: Vec<SnackView>,
}

impl CategoryView {
    /// Starts a view for `category` with no snacks yet.
    #[must_use]
    pub fn new(
        category: &snack_category::Model,
        description: Option<&category_description::Model>,
    ) -> Self {
        Self {
            name: category.name.clone(),
            position_order: category.position_order,
            path_img: category.path_img.clone(),
            description: description.map(DescriptionView::from),
            snacks: Vec::new(),
        }
    }
}

/// A snack line of an order, priced at the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnackLineView {
    /// Snack name at order time
    pub name: String,
    /// Unit price snapshot
    pub price: Decimal,
    /// Units ordered
    pub quantity: i32,
    /// Price times quantity
    pub total: Decimal,
}

/// A lunch line of an order, priced at the snapshot.
///
/// `total` covers the ingredient charge only; the dish price is charged once per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LunchLineView {
    /// Weekday of the dish
    pub day_name: &'static str,
    /// Ingredient name at order time
    pub ingredient: String,
    /// Dish price snapshot
    pub dish_price: Decimal,
    /// Ingredient charge snapshot
    pub ingredient_price: Decimal,
    /// Units for quantified extras
    pub quantity: Option<i32>,
    /// Ingredient charge times units
    pub total: Decimal,
}

/// Full order as returned to its owner or to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    /// Opaque identifier the order is addressed by
    pub public_id: Uuid,
    /// Owner of the order
    pub user_id: i64,
    /// Who placed it; differs from the owner for staff orders
    pub creator_id: i64,
    /// When the order was placed
    pub creation_date: DateTime<Utc>,
    /// Snack subtotal
    pub amount_snacks: Decimal,
    /// Dish price plus ingredient charges
    pub amount_lunch: Decimal,
    /// Total to pay
    pub amount_due: Decimal,
    /// Whether the kitchen handed it out
    pub fulfilled: bool,
    /// When it was paid, if it was
    pub final_payment: Option<DateTime<Utc>>,
    /// Hidden from the queues
    pub hidden: bool,
    /// Note for the kitchen
    pub description: Option<String>,
    /// Snack lines
    pub snacks: Vec<SnackLineView>,
    /// Lunch lines
    pub lunch: Vec<LunchLineView>,
}

impl OrderDetail {
    /// Starts a detail view for `order` with no lines yet.
    #[must_use]
    pub fn new(order: &order::Model) -> Self {
        Self {
            public_id: order.public_id,
            user_id: order.user_id,
            creator_id: order.creator_id,
            creation_date: order.creation_date,
            amount_snacks: money(order.amount_snacks),
            amount_lunch: money(order.amount_lunch),
            amount_due: money(order.amount_due),
            fulfilled: order.fulfilled,
            final_payment: order.final_payment,
            hidden: order.hidden,
            description: order.description.clone(),
            snacks: Vec::new(),
            lunch: Vec::new(),
        }
    }

    /// The shape pushed to the staff queues.
    #[must_use]
    pub fn to_live(&self) -> LiveOrder {
        LiveOrder {
            public_id: self.public_id,
            user_id: self.user_id,
            amount_due: self.amount_due,
            final_payment: self.final_payment,
            description: self.description.clone(),
            snacks: self.snacks.clone(),
            lunch: self.lunch.clone(),
        }
    }
}

/// Order entry in a live staff queue: what to prepare and what is owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveOrder {
    /// Opaque order identifier
    pub public_id: Uuid,
    /// Owner of the order
    pub user_id: i64,
    /// Total to pay
    pub amount_due: Decimal,
    /// When it was paid, if it was
    pub final_payment: Option<DateTime<Utc>>,
    /// Note for the kitchen
    pub description: Option<String>,
    /// Snacks to hand out
    pub snacks: Vec<SnackLineView>,
    /// Ingredients to prepare
    pub lunch: Vec<LunchLineView>,
}

//! Lunch catalog - weekday dishes, ingredients and the compositions linking them.
//!
//! Every mutation here is staff-only and runs in one database transaction. Any change
//! that vacates a positive choice group (deleting or moving a composition, soft-deleting
//! an ingredient) renumbers the dish's groups before the transaction commits. After the
//! commit the lunch menu topic is published.

use crate::{
    auth::Actor,
    config::menu::{DishSeed, MenuConfig},
    core::{
        active::{SoftDelete, active_compositions},
        choice_group,
        views::{DishView, IngredientView},
    },
    entities::{Composition, Dish, Ingredient, composition, dish, ingredient},
    errors::{Error, Result},
    live::{Publisher, Topic},
};
use chrono::NaiveTime;
use sea_orm::{
    ActiveValue::NotSet, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*,
};
use tracing::{debug, info};

/// Optional edits to a dish. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DishUpdate {
    /// New base price, charged once per lunch order
    pub price: Option<Decimal>,
    /// Start of the ordering window; `Some(None)` clears it
    pub initial_deadline: Option<Option<NaiveTime>>,
    /// End of the ordering window; `Some(None)` clears it
    pub deadline: Option<Option<NaiveTime>>,
    /// Menu text; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// Image path; `Some(None)` clears it
    pub path_img: Option<Option<String>>,
}

/// Optional edits to an ingredient. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct IngredientUpdate {
    /// New name, unique among active ingredients
    pub name: Option<String>,
    /// Extra charge; `Some(None)` or zero makes it free
    pub additional_charge: Option<Option<Decimal>>,
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "The price must be greater than zero, got {price}"
        )));
    }
    Ok(())
}

fn validate_window(initial: Option<NaiveTime>, deadline: Option<NaiveTime>) -> Result<()> {
    if let (Some(initial), Some(deadline)) = (initial, deadline) {
        if initial > deadline {
            return Err(Error::validation(format!(
                "The ordering window opens at {initial} but closes at {deadline}"
            )));
        }
    }
    Ok(())
}

/// Zero and absent charges mean the same thing; only a positive charge is stored.
fn normalize_charge(charge: Option<Decimal>) -> Result<Option<Decimal>> {
    match charge {
        Some(c) if c < Decimal::ZERO => Err(Error::validation(format!(
            "The additional charge cannot be negative, got {c}"
        ))),
        Some(c) if c.is_zero() => Ok(None),
        other => Ok(other),
    }
}

// ---------------------------------------------------------------------------
// Dishes
// ---------------------------------------------------------------------------

/// Creates the weekday dishes from `config` if the dish table is empty.
///
/// Returns the number of dishes created; 0 when dishes already exist.
pub async fn seed_weekday_dishes(db: &DatabaseConnection, config: &MenuConfig) -> Result<usize> {
    let existing = Dish::find().count(db).await?;
    if existing > 0 {
        debug!("{} dish(es) already present, skipping seed", existing);
        return Ok(0);
    }

    let txn = db.begin().await?;
    for seed in &config.dishes {
        create_dish(&txn, seed).await?;
    }
    txn.commit().await?;

    info!("Seeded {} weekday dish(es)", config.dishes.len());
    Ok(config.dishes.len())
}

/// Creates the dish for one weekday.
///
/// # Errors
/// Returns [`Error::Validation`] if the day is outside 1..=7 or already has a dish, the
/// price is not positive, or the ordering window closes before it opens.
pub async fn create_dish<C>(db: &C, seed: &DishSeed) -> Result<dish::Model>
where
    C: ConnectionTrait,
{
    if !(1..=7).contains(&seed.day) {
        return Err(Error::validation(format!(
            "Day must be between 1 and 7, got {}",
            seed.day
        )));
    }
    validate_price(seed.price)?;
    validate_window(seed.initial_deadline, seed.deadline)?;

    if get_dish_by_day(db, seed.day).await?.is_some() {
        return Err(Error::validation(format!(
            "A dish for day {} already exists",
            seed.day
        )));
    }

    let dish = dish::ActiveModel {
        day: Set(seed.day),
        price: Set(seed.price),
        initial_deadline: Set(seed.initial_deadline),
        deadline: Set(seed.deadline),
        description: Set(seed.description.clone()),
        path_img: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!("Created dish for day {}", dish.day);
    Ok(dish)
}

/// All dishes, Monday first.
pub async fn get_week(db: &DatabaseConnection) -> Result<Vec<dish::Model>> {
    Dish::find()
        .order_by_asc(dish::Column::Day)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The dish served on `day` (Monday = 1), if any.
pub async fn get_dish_by_day<C>(db: &C, day: i32) -> Result<Option<dish::Model>>
where
    C: ConnectionTrait,
{
    Dish::find()
        .filter(dish::Column::Day.eq(day))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_dish<C>(db: &C, day: i32) -> Result<dish::Model>
where
    C: ConnectionTrait,
{
    get_dish_by_day(db, day)
        .await?
        .ok_or_else(|| Error::not_found("dish", day))
}

/// Edits price, ordering window, description or image of the dish for `day`.
pub async fn update_dish(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    day: i32,
    update: DishUpdate,
) -> Result<dish::Model> {
    actor.require_staff()?;

    let current = require_dish(db, day).await?;

    if let Some(price) = update.price {
        validate_price(price)?;
    }
    let initial = update.initial_deadline.unwrap_or(current.initial_deadline);
    let deadline = update.deadline.unwrap_or(current.deadline);
    validate_window(initial, deadline)?;

    let mut active: dish::ActiveModel = current.into();
    if let Some(price) = update.price {
        active.price = Set(price);
    }
    active.initial_deadline = Set(initial);
    active.deadline = Set(deadline);
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(path_img) = update.path_img {
        active.path_img = Set(path_img);
    }
    let dish = active.update(db).await?;

    info!("Dish for day {} updated by user {}", day, actor.user_id);
    publisher.publish(&[Topic::LunchMenu]);
    Ok(dish)
}

// ---------------------------------------------------------------------------
// Ingredients
// ---------------------------------------------------------------------------

/// Active ingredients, alphabetically.
pub async fn list_active_ingredients(db: &DatabaseConnection) -> Result<Vec<ingredient::Model>> {
    Ingredient::find_active()
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active ingredient by name.
pub async fn get_ingredient_by_name<C>(db: &C, name: &str) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find_active()
        .filter(ingredient::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_ingredient<C>(db: &C, name: &str) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    get_ingredient_by_name(db, name)
        .await?
        .ok_or_else(|| Error::not_found("ingredient", name))
}

/// Creates an ingredient.
///
/// # Errors
/// Returns [`Error::Validation`] if the name is empty or taken by an active ingredient,
/// or the charge is negative.
pub async fn create_ingredient(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    name: &str,
    additional_charge: Option<Decimal>,
) -> Result<ingredient::Model> {
    actor.require_staff()?;

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Ingredient name cannot be empty"));
    }
    let additional_charge = normalize_charge(additional_charge)?;
    if get_ingredient_by_name(db, name).await?.is_some() {
        return Err(Error::validation(format!(
            "Ingredient '{name}' already exists"
        )));
    }

    let ingredient = ingredient::ActiveModel {
        name: Set(name.to_string()),
        additional_charge: Set(additional_charge),
        deletion_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created ingredient '{}'", ingredient.name);
    publisher.publish(&[Topic::LunchMenu]);
    Ok(ingredient)
}

/// Renames an ingredient or changes its charge.
pub async fn update_ingredient(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    name: &str,
    update: IngredientUpdate,
) -> Result<ingredient::Model> {
    actor.require_staff()?;

    let current = require_ingredient(db, name).await?;
    let mut active: ingredient::ActiveModel = current.clone().into();

    if let Some(new_name) = update.name {
        let new_name = new_name.trim().to_string();
        if new_name.is_empty() {
            return Err(Error::validation("Ingredient name cannot be empty"));
        }
        if new_name != current.name && get_ingredient_by_name(db, &new_name).await?.is_some() {
            return Err(Error::validation(format!(
                "Ingredient '{new_name}' already exists"
            )));
        }
        active.name = Set(new_name);
    }
    if let Some(charge) = update.additional_charge {
        active.additional_charge = Set(normalize_charge(charge)?);
    }

    let ingredient = active.update(db).await?;
    info!("Updated ingredient '{}'", ingredient.name);
    publisher.publish(&[Topic::LunchMenu]);
    Ok(ingredient)
}

/// Soft-deletes an ingredient and closes the choice groups it leaves behind.
pub async fn delete_ingredient(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    name: &str,
) -> Result<ingredient::Model> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let current = require_ingredient(&txn, name).await?;

    let vacated = Composition::find()
        .filter(composition::Column::IngredientId.eq(current.id))
        .filter(composition::Column::ChoiceGroupNumber.gt(0))
        .all(&txn)
        .await?;

    let mut active: ingredient::ActiveModel = current.into();
    active.deletion_date = Set(Some(chrono::Utc::now()));
    let ingredient = active.update(&txn).await?;

    for link in &vacated {
        choice_group::renumber_after_removal(&txn, link.dish_id, link.choice_group_number)
            .await?;
    }
    txn.commit().await?;

    info!(
        "Deleted ingredient '{}' ({} dish group(s) renumbered)",
        ingredient.name,
        vacated.len()
    );
    publisher.publish(&[Topic::LunchMenu]);
    Ok(ingredient)
}

// ---------------------------------------------------------------------------
// Compositions
// ---------------------------------------------------------------------------

async fn find_composition<C>(
    db: &C,
    dish: &dish::Model,
    ingredient: &ingredient::Model,
) -> Result<Option<composition::Model>>
where
    C: ConnectionTrait,
{
    Composition::find()
        .filter(composition::Column::DishId.eq(dish.id))
        .filter(composition::Column::IngredientId.eq(ingredient.id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Active composition of `dish` for the ingredient called `name`.
pub async fn find_active_composition<C>(
    db: &C,
    dish: &dish::Model,
    name: &str,
) -> Result<Option<(composition::Model, ingredient::Model)>>
where
    C: ConnectionTrait,
{
    let Some(ingredient) = get_ingredient_by_name(db, name).await? else {
        return Ok(None);
    };
    Ok(find_composition(db, dish, &ingredient)
        .await?
        .map(|link| (link, ingredient)))
}

/// Links each named ingredient to the dish for `day`, all in the same choice group.
///
/// `group` is 0 for multiple choice or at most one past the dish's current highest
/// group.
pub async fn add_compositions(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    day: i32,
    ingredient_names: &[String],
    group: i32,
) -> Result<Vec<composition::Model>> {
    actor.require_staff()?;
    if ingredient_names.is_empty() {
        return Err(Error::validation("At least one ingredient is required"));
    }

    let txn = db.begin().await?;
    let dish = require_dish(&txn, day).await?;
    let current_max = choice_group::max_group_number(&txn, dish.id).await?;
    choice_group::validate_group_number(group, current_max)?;

    let mut created = Vec::with_capacity(ingredient_names.len());
    for name in ingredient_names {
        let ingredient = require_ingredient(&txn, name).await?;
        if find_composition(&txn, &dish, &ingredient).await?.is_some() {
            return Err(Error::validation(format!(
                "'{}' is already part of the dish for day {day}",
                ingredient.name
            )));
        }

        let link = composition::ActiveModel {
            id: NotSet,
            dish_id: Set(dish.id),
            ingredient_id: Set(ingredient.id),
            choice_group_number: Set(group),
        }
        .insert(&txn)
        .await?;
        created.push(link);
    }
    txn.commit().await?;

    info!(
        "Linked {} ingredient(s) to day {} in group {}",
        created.len(),
        day,
        group
    );
    publisher.publish(&[Topic::LunchMenu]);
    Ok(created)
}

/// Moves an ingredient of the dish for `day` to another choice group.
pub async fn update_composition(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    day: i32,
    ingredient_name: &str,
    group: i32,
) -> Result<composition::Model> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let dish = require_dish(&txn, day).await?;
    let (link, _) = find_active_composition(&txn, &dish, ingredient_name)
        .await?
        .ok_or_else(|| Error::not_found("composition", ingredient_name))?;

    let previous = link.choice_group_number;
    if previous == group {
        return Ok(link);
    }

    let current_max = choice_group::max_group_number(&txn, dish.id).await?;
    choice_group::validate_group_number(group, current_max)?;

    let link_id = link.id;
    let mut active: composition::ActiveModel = link.into();
    active.choice_group_number = Set(group);
    active.update(&txn).await?;

    choice_group::renumber_after_removal(&txn, dish.id, previous).await?;

    // Renumbering may have shifted the moved link too.
    let link = Composition::find_by_id(link_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("composition", link_id))?;
    txn.commit().await?;

    info!(
        "Moved '{}' on day {} from group {} to {}",
        ingredient_name, day, previous, link.choice_group_number
    );
    publisher.publish(&[Topic::LunchMenu]);
    Ok(link)
}

/// Removes an ingredient from the dish for `day`.
pub async fn delete_composition(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    day: i32,
    ingredient_name: &str,
) -> Result<()> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let dish = require_dish(&txn, day).await?;
    let (link, _) = find_active_composition(&txn, &dish, ingredient_name)
        .await?
        .ok_or_else(|| Error::not_found("composition", ingredient_name))?;

    let vacated = link.choice_group_number;
    Composition::delete_by_id(link.id).exec(&txn).await?;
    choice_group::renumber_after_removal(&txn, dish.id, vacated).await?;
    txn.commit().await?;

    info!("Removed '{}' from day {}", ingredient_name, day);
    publisher.publish(&[Topic::LunchMenu]);
    Ok(())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// The dish with its active ingredients, split into multiple and single choice.
pub async fn dish_view<C>(db: &C, dish: &dish::Model) -> Result<DishView>
where
    C: ConnectionTrait,
{
    let links = Composition::find()
        .find_also_related(Ingredient)
        .filter(composition::Column::DishId.eq(dish.id))
        .filter(ingredient::Column::DeletionDate.is_null())
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?;

    let mut view = DishView::new(dish);
    for (link, ingredient) in links {
        if let Some(ingredient) = ingredient {
            view.ingredients
                .push(link.choice_group_number, IngredientView::from(&ingredient));
        }
    }
    Ok(view)
}

/// Every dish of the week with its ingredients.
pub async fn week_menu(db: &DatabaseConnection) -> Result<Vec<DishView>> {
    let mut menu = Vec::new();
    for dish in get_week(db).await? {
        menu.push(dish_view(db, &dish).await?);
    }
    Ok(menu)
}

/// The menu for one day.
///
/// # Errors
/// Returns [`Error::CatalogNotFound`] if no dish is configured for `day`.
pub async fn day_menu(db: &DatabaseConnection, day: i32) -> Result<DishView> {
    let dish = get_dish_by_day(db, day)
        .await?
        .ok_or(Error::CatalogNotFound { day })?;
    dish_view(db, &dish).await
}

/// Number of active compositions of a dish.
pub async fn count_active_compositions<C>(db: &C, dish_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    active_compositions()
        .filter(composition::Column::DishId.eq(dish_id))
        .count(db)
        .await
        .map_err(Into::into)
}

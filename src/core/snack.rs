//! Snack catalog - categories, their descriptions and the snacks they hold.
//!
//! Categories keep a dense `position_order` of 1..N among active categories; creating
//! appends, deleting and reordering re-sequence. A soft-deleted category hides its
//! snacks from every listing even though the snack rows stay active. All mutations are
//! staff-only and publish the snack stock topic after they commit.

use crate::{
    auth::Actor,
    core::{
        active::{SoftDelete, active_snacks},
        views::CategoryView,
    },
    entities::{
        CategoryDescription, Snack, SnackCategory, category_description, snack, snack_category,
    },
    errors::{Error, Result},
    live::{Publisher, Topic},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::info;

/// Input for a new snack.
#[derive(Debug, Clone)]
pub struct NewSnack {
    /// Display name, unique among active snacks
    pub name: String,
    /// Units available to order
    pub quantity_in_stock: i32,
    /// Unit price
    pub price: Decimal,
    /// Optional blurb
    pub description: Option<String>,
    /// Optional image path
    pub path_img: Option<String>,
}

/// Optional edits to a snack. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SnackUpdate {
    /// New display name
    pub name: Option<String>,
    /// Restocked unit count
    pub quantity_in_stock: Option<i32>,
    /// New unit price
    pub price: Option<Decimal>,
    /// Blurb; `Some(None)` clears it
    pub description: Option<Option<String>>,
    /// Image path; `Some(None)` clears it
    pub path_img: Option<Option<String>>,
    /// Name of the active category to move the snack to
    pub category: Option<String>,
}

/// Optional edits to a category's description.
#[derive(Debug, Clone, Default)]
pub struct DescriptionUpdate {
    /// Heading
    pub title: Option<String>,
    /// Body copy
    pub text: Option<String>,
    /// Illustration; `Some(None)` clears it
    pub illustration_url: Option<Option<String>>,
}

/// Optional edits to a category.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    /// New name, unique among active categories
    pub name: Option<String>,
    /// Image path; `Some(None)` clears it
    pub path_img: Option<Option<String>>,
    /// Edits to the description, created if missing
    pub description: Option<DescriptionUpdate>,
}

fn clean_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{what} name cannot be empty")));
    }
    Ok(name.to_string())
}

fn validate_snack_values(quantity_in_stock: i32, price: Decimal) -> Result<()> {
    if quantity_in_stock < 0 {
        return Err(Error::validation(format!(
            "Stock cannot be negative, got {quantity_in_stock}"
        )));
    }
    if price <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "The price must be greater than zero, got {price}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Active categories in display order.
pub async fn list_categories<C>(db: &C) -> Result<Vec<snack_category::Model>>
where
    C: ConnectionTrait,
{
    SnackCategory::find_active()
        .order_by_asc(snack_category::Column::PositionOrder)
        .order_by_asc(snack_category::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active category by name.
pub async fn get_category_by_name<C>(db: &C, name: &str) -> Result<Option<snack_category::Model>>
where
    C: ConnectionTrait,
{
    SnackCategory::find_active()
        .filter(snack_category::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_category<C>(db: &C, name: &str) -> Result<snack_category::Model>
where
    C: ConnectionTrait,
{
    get_category_by_name(db, name)
        .await?
        .ok_or_else(|| Error::not_found("category", name))
}

/// Assigns positions 1..N to `ordered`, writing only the rows whose position changed.
async fn resequence<C>(db: &C, ordered: Vec<snack_category::Model>) -> Result<()>
where
    C: ConnectionTrait,
{
    for (category, position) in ordered.into_iter().zip(1..) {
        if category.position_order != position {
            let mut active: snack_category::ActiveModel = category.into();
            active.position_order = Set(position);
            active.update(db).await?;
        }
    }
    Ok(())
}

/// Creates a category at the end of the display order, with a default description.
pub async fn create_category(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    name: &str,
    path_img: Option<String>,
) -> Result<snack_category::Model> {
    actor.require_staff()?;
    let name = clean_name(name, "Category")?;

    let txn = db.begin().await?;
    if get_category_by_name(&txn, &name).await?.is_some() {
        return Err(Error::validation(format!("Category '{name}' already exists")));
    }

    let position = list_categories(&txn)
        .await?
        .iter()
        .map(|c| c.position_order)
        .max()
        .unwrap_or(0)
        + 1;

    let category = snack_category::ActiveModel {
        name: Set(name.clone()),
        position_order: Set(position),
        path_img: Set(path_img),
        deletion_date: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    category_description::ActiveModel {
        category_id: Set(category.id),
        title: Set(name),
        text: Set(String::new()),
        illustration_url: Set(None),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(
        "Created category '{}' at position {}",
        category.name, category.position_order
    );
    publisher.publish(&[Topic::SnackStock]);
    Ok(category)
}

/// Renames a category or edits its image and description.
pub async fn update_category(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    name: &str,
    update: CategoryUpdate,
) -> Result<snack_category::Model> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let current = require_category(&txn, name).await?;
    let category_id = current.id;
    let mut active: snack_category::ActiveModel = current.clone().into();

    if let Some(new_name) = update.name {
        let new_name = clean_name(&new_name, "Category")?;
        if new_name != current.name && get_category_by_name(&txn, &new_name).await?.is_some() {
            return Err(Error::validation(format!(
                "Category '{new_name}' already exists"
            )));
        }
        active.name = Set(new_name);
    }
    if let Some(path_img) = update.path_img {
        active.path_img = Set(path_img);
    }
    let category = active.update(&txn).await?;

    if let Some(edit) = update.description {
        let existing = CategoryDescription::find_by_id(category_id).one(&txn).await?;
        let is_new = existing.is_none();
        let mut description = existing.map_or_else(
            || category_description::ActiveModel {
                category_id: Set(category_id),
                title: Set(category.name.clone()),
                text: Set(String::new()),
                illustration_url: Set(None),
            },
            Into::into,
        );
        if let Some(title) = edit.title {
            description.title = Set(title);
        }
        if let Some(text) = edit.text {
            description.text = Set(text);
        }
        if let Some(url) = edit.illustration_url {
            description.illustration_url = Set(url);
        }
        if is_new {
            description.insert(&txn).await?;
        } else {
            description.update(&txn).await?;
        }
    }
    txn.commit().await?;

    info!("Updated category '{}'", category.name);
    publisher.publish(&[Topic::SnackStock]);
    Ok(category)
}

/// Soft-deletes a category and closes the gap in the display order.
pub async fn delete_category(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    name: &str,
) -> Result<snack_category::Model> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let current = require_category(&txn, name).await?;
    let mut active: snack_category::ActiveModel = current.into();
    active.deletion_date = Set(Some(chrono::Utc::now()));
    let category = active.update(&txn).await?;

    resequence(&txn, list_categories(&txn).await?).await?;
    txn.commit().await?;

    info!("Deleted category '{}'", category.name);
    publisher.publish(&[Topic::SnackStock]);
    Ok(category)
}

/// Moves the named categories to the front, in the given order.
///
/// Unknown names are ignored; categories not listed keep their relative order after
/// the listed ones. Returns the categories in their new order.
pub async fn reorder_categories(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    names: &[String],
) -> Result<Vec<snack_category::Model>> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let mut remaining = list_categories(&txn).await?;
    let mut ordered = Vec::with_capacity(remaining.len());
    for name in names {
        if let Some(index) = remaining.iter().position(|c| c.name == name.trim()) {
            ordered.push(remaining.remove(index));
        }
    }
    ordered.append(&mut remaining);

    resequence(&txn, ordered).await?;
    let categories = list_categories(&txn).await?;
    txn.commit().await?;

    info!("Reordered {} categories", categories.len());
    publisher.publish(&[Topic::SnackStock]);
    Ok(categories)
}

// ---------------------------------------------------------------------------
// Snacks
// ---------------------------------------------------------------------------

/// Finds an active snack by name inside an active category.
pub async fn find_active_snack<C>(
    db: &C,
    category: &str,
    name: &str,
) -> Result<Option<snack::Model>>
where
    C: ConnectionTrait,
{
    active_snacks()
        .filter(snack_category::Column::Name.eq(category.trim()))
        .filter(snack::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn name_taken<C>(db: &C, name: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(active_snacks()
        .filter(snack::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some())
}

/// Creates a snack in an active category.
///
/// # Errors
/// Returns an error if:
/// - The category does not exist
/// - The name is empty or taken by another active snack
/// - The stock is negative or the price is not positive
pub async fn create_snack(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    category: &str,
    new: NewSnack,
) -> Result<snack::Model> {
    actor.require_staff()?;
    let name = clean_name(&new.name, "Snack")?;
    validate_snack_values(new.quantity_in_stock, new.price)?;

    let category = require_category(db, category).await?;
    if name_taken(db, &name).await? {
        return Err(Error::validation(format!("Snack '{name}' already exists")));
    }

    let snack = snack::ActiveModel {
        name: Set(name),
        quantity_in_stock: Set(new.quantity_in_stock),
        price: Set(new.price),
        description: Set(new.description),
        path_img: Set(new.path_img),
        deletion_date: Set(None),
        category_id: Set(category.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Created snack '{}' in '{}' with {} in stock",
        snack.name, category.name, snack.quantity_in_stock
    );
    publisher.publish(&[Topic::SnackStock]);
    Ok(snack)
}

/// Edits a snack, including restocking and moving it to another category.
pub async fn update_snack(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    category: &str,
    name: &str,
    update: SnackUpdate,
) -> Result<snack::Model> {
    actor.require_staff()?;

    let current = find_active_snack(db, category, name)
        .await?
        .ok_or_else(|| Error::not_found("snack", name))?;
    validate_snack_values(
        update.quantity_in_stock.unwrap_or(current.quantity_in_stock),
        update.price.unwrap_or(current.price),
    )?;

    let mut active: snack::ActiveModel = current.clone().into();
    if let Some(new_name) = update.name {
        let new_name = clean_name(&new_name, "Snack")?;
        if new_name != current.name && name_taken(db, &new_name).await? {
            return Err(Error::validation(format!(
                "Snack '{new_name}' already exists"
            )));
        }
        active.name = Set(new_name);
    }
    if let Some(target) = update.category {
        active.category_id = Set(require_category(db, &target).await?.id);
    }
    if let Some(quantity) = update.quantity_in_stock {
        active.quantity_in_stock = Set(quantity);
    }
    if let Some(price) = update.price {
        active.price = Set(price);
    }
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(path_img) = update.path_img {
        active.path_img = Set(path_img);
    }
    let snack = active.update(db).await?;

    info!("Updated snack '{}'", snack.name);
    publisher.publish(&[Topic::SnackStock]);
    Ok(snack)
}

/// Soft-deletes a snack. Past orders keep referencing it.
pub async fn delete_snack(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    category: &str,
    name: &str,
) -> Result<snack::Model> {
    actor.require_staff()?;

    let current = find_active_snack(db, category, name)
        .await?
        .ok_or_else(|| Error::not_found("snack", name))?;
    let mut active: snack::ActiveModel = current.into();
    active.deletion_date = Set(Some(chrono::Utc::now()));
    let snack = active.update(db).await?;

    info!("Deleted snack '{}'", snack.name);
    publisher.publish(&[Topic::SnackStock]);
    Ok(snack)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Active categories in display order, each with its active snacks by name.
pub async fn stock_view<C>(db: &C) -> Result<Vec<CategoryView>>
where
    C: ConnectionTrait,
{
    let categories = SnackCategory::find_active()
        .find_also_related(CategoryDescription)
        .order_by_asc(snack_category::Column::PositionOrder)
        .order_by_asc(snack_category::Column::Id)
        .all(db)
        .await?;

    let ids: Vec<i64> = categories.iter().map(|(c, _)| c.id).collect();
    let mut snacks_by_category: HashMap<i64, Vec<snack::Model>> = HashMap::new();
    for snack in Snack::find_active()
        .filter(snack::Column::CategoryId.is_in(ids))
        .order_by_asc(snack::Column::Name)
        .all(db)
        .await?
    {
        snacks_by_category
            .entry(snack.category_id)
            .or_default()
            .push(snack);
    }

    Ok(categories
        .iter()
        .map(|(category, description)| {
            let mut view = CategoryView::new(category, description.as_ref());
            view.snacks = snacks_by_category
                .get(&category.id)
                .map(|snacks| snacks.iter().map(Into::into).collect())
                .unwrap_or_default();
            view
        })
        .collect())
}

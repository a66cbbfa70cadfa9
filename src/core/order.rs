//! Order builder and order lifecycle.
//!
//! [`create_order`] turns a cart into a persisted order inside a single transaction:
//! snack lines reserve stock through the stock ledger, lunch lines are checked against
//! today's dish and its choice groups, and every line stores a price snapshot. Any
//! failure drops the transaction, which rolls back every reservation and line the cart
//! had already written. Notifications go out only after the commit.
//!
//! Staff move orders through their lifecycle with [`mark_fulfilled`] and [`mark_paid`];
//! an unpaid order can be deleted with [`delete_order`], which returns its snacks to
//! stock.

use crate::{
    auth::Actor,
    core::{
        active::SoftDelete,
        catalog, snack, stock, user,
        views::{LiveOrder, LunchLineView, OrderDetail, SnackLineView, day_name, money},
    },
    entities::{
        BuyIngredient, BuySnack, Dish, Ingredient, Order, Snack, buy_ingredient, buy_snack, dish,
        ingredient, order,
    },
    errors::{Error, Result},
    live::{Publisher, Topic},
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

/// One snack in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnackRequest {
    /// Snack name within the category
    pub name: String,
    /// Units to reserve, at least 1
    pub quantity: i32,
}

/// One lunch ingredient in a cart. `quantity` is absent for extras that are not counted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LunchRequest {
    /// Name of an active ingredient on today's dish
    pub ingredient_name: String,
    /// Units for quantified extras
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// A validated cart as handed over by the request layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewOrder {
    /// Name of the user the order is for; only honored for staff
    #[serde(default)]
    pub on_behalf_of: Option<String>,
    /// Category name to the snacks requested from it
    #[serde(default)]
    pub snacks: BTreeMap<String, Vec<SnackRequest>>,
    /// Ingredient picks for today's dish; empty for snack-only orders
    #[serde(default)]
    pub lunch: Vec<LunchRequest>,
    /// Free-form note for the kitchen
    #[serde(default)]
    pub description: Option<String>,
}

impl NewOrder {
    fn has_snacks(&self) -> bool {
        self.snacks.values().any(|items| !items.is_empty())
    }
}

/// Which staff queue to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    All,
    SnackOnly,
    Lunch,
}

/// Topics touched by a change to an order, snack stock included when `snacks` moved.
fn order_topics(snacks: bool) -> Vec<Topic> {
    let mut topics = Topic::ORDERS.to_vec();
    if snacks {
        topics.push(Topic::SnackStock);
    }
    topics
}

/// Rejects malformed carts before any database work.
fn validate_cart(request: &NewOrder) -> Result<()> {
    if !request.has_snacks() && request.lunch.is_empty() {
        return Err(Error::EmptyCart);
    }

    let mut seen = HashSet::new();
    for (category, items) in &request.snacks {
        for item in items {
            if item.quantity < 1 {
                return Err(Error::validation(format!(
                    "Quantity of '{}' must be at least 1",
                    item.name
                )));
            }
            if !seen.insert((category.trim(), item.name.trim())) {
                return Err(Error::validation(format!(
                    "'{}' appears more than once in the cart",
                    item.name
                )));
            }
        }
    }

    let mut seen = HashSet::new();
    for item in &request.lunch {
        if item.quantity.is_some_and(|q| q < 1) {
            return Err(Error::validation(format!(
                "Quantity of '{}' must be at least 1",
                item.ingredient_name
            )));
        }
        if !seen.insert(item.ingredient_name.trim()) {
            return Err(Error::validation(format!(
                "'{}' appears more than once in the cart",
                item.ingredient_name
            )));
        }
    }
    Ok(())
}

/// The user the order belongs to: a named user when staff orders for someone else,
/// otherwise the actor.
async fn resolve_owner(db: &DatabaseConnection, actor: &Actor, on_behalf_of: Option<&str>) -> Result<i64> {
    match on_behalf_of {
        Some(name) if actor.is_staff => Ok(user::get_active_user_by_name(db, name)
            .await?
            .ok_or_else(|| Error::not_found("user", name))?
            .id),
        Some(name) => {
            warn!(
                "User {} tried to order on behalf of '{}'; ignoring",
                actor.user_id, name
            );
            Ok(actor.user_id)
        }
        None => Ok(actor.user_id),
    }
}

/// Places an order dated now. See [`create_order_at`].
pub async fn create_order(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    request: NewOrder,
) -> Result<OrderDetail> {
    create_order_at(db, publisher, actor, request, Utc::now()).await
}

/// Places an order as of `now`, which picks today's dish.
///
/// # Errors
/// Returns an error if:
/// - The cart is empty ([`Error::EmptyCart`]) or malformed ([`Error::Validation`])
/// - Lunch is requested but no dish is served on `now`'s weekday
///   ([`Error::CatalogNotFound`])
/// - A snack, ingredient or target user does not exist ([`Error::NotFound`])
/// - A snack has too little stock ([`Error::InsufficientStock`])
/// - Two ingredients of the same single-choice group are requested
///   ([`Error::ChoiceConflict`])
pub async fn create_order_at(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    request: NewOrder,
    now: DateTime<Utc>,
) -> Result<OrderDetail> {
    validate_cart(&request)?;
    let owner_id = resolve_owner(db, actor, request.on_behalf_of.as_deref()).await?;

    let txn = db.begin().await?;

    let day = i32::try_from(now.weekday().number_from_monday()).unwrap_or_default();
    let dish = if request.lunch.is_empty() {
        None
    } else {
        Some(
            catalog::get_dish_by_day(&txn, day)
                .await?
                .ok_or(Error::CatalogNotFound { day })?,
        )
    };

    // The header goes in first so the lines can reference it; totals follow below.
    let header = order::ActiveModel {
        public_id: Set(Uuid::new_v4()),
        user_id: Set(owner_id),
        creator_id: Set(actor.user_id),
        creation_date: Set(now),
        amount_snacks: Set(Decimal::ZERO),
        amount_lunch: Set(Decimal::ZERO),
        amount_due: Set(Decimal::ZERO),
        fulfilled: Set(false),
        final_payment: Set(None),
        hidden: Set(false),
        description: Set(request.description.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut amount_snacks = Decimal::ZERO;
    for (category, items) in &request.snacks {
        for item in items {
            let snack = snack::find_active_snack(&txn, category, &item.name)
                .await?
                .ok_or_else(|| Error::not_found("snack", format!("{category}/{}", item.name)))?;

            stock::reserve(&txn, snack.id, item.quantity).await?;

            buy_snack::ActiveModel {
                order_id: Set(header.id),
                snack_id: Set(snack.id),
                quantity: Set(item.quantity),
                price_to_purchase: Set(snack.price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            amount_snacks += snack.price * Decimal::from(item.quantity);
        }
    }

    let mut amount_lunch = Decimal::ZERO;
    if let Some(dish) = &dish {
        let mut taken: HashMap<i32, String> = HashMap::new();
        amount_lunch = dish.price;

        for item in &request.lunch {
            let (link, ingredient) =
                catalog::find_active_composition(&txn, dish, &item.ingredient_name)
                    .await?
                    .ok_or_else(|| Error::not_found("ingredient", &item.ingredient_name))?;

            let group = link.choice_group_number;
            if group > 0 {
                if let Some(first) = taken.get(&group) {
                    warn!(
                        "'{}' conflicts with '{}' in choice group {}",
                        ingredient.name, first, group
                    );
                    return Err(Error::ChoiceConflict {
                        group,
                        ingredient: ingredient.name,
                    });
                }
                taken.insert(group, ingredient.name.clone());
            }

            let charge = ingredient.additional_charge.unwrap_or(Decimal::ZERO);
            buy_ingredient::ActiveModel {
                order_id: Set(header.id),
                dish_id: Set(dish.id),
                ingredient_id: Set(ingredient.id),
                quantity: Set(item.quantity),
                price_to_purchase_dish: Set(dish.price),
                price_to_purchase_ingredient: Set(charge),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            amount_lunch += charge * Decimal::from(item.quantity.unwrap_or(1));
        }
    }

    let mut totals: order::ActiveModel = header.into();
    totals.amount_snacks = Set(amount_snacks);
    totals.amount_lunch = Set(amount_lunch);
    totals.amount_due = Set(amount_snacks + amount_lunch);
    let order = totals.update(&txn).await?;

    txn.commit().await?;

    info!(
        "Order {} placed for user {} by user {}: due {}",
        order.public_id,
        order.user_id,
        order.creator_id,
        money(order.amount_due)
    );
    publisher.publish(&order_topics(request.has_snacks()));

    load_detail(db, order).await
}

async fn find_by_public_id<C>(db: &C, public_id: Uuid) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find()
        .filter(order::Column::PublicId.eq(public_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads an order the actor may see. Orders of other users read as missing.
async fn find_accessible<C>(db: &C, actor: &Actor, public_id: Uuid) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    find_by_public_id(db, public_id)
        .await?
        .filter(|order| actor.can_access(order.user_id))
        .ok_or_else(|| Error::not_found("order", public_id))
}

/// Fetches one order with its lines.
pub async fn get_order(db: &DatabaseConnection, actor: &Actor, public_id: Uuid) -> Result<OrderDetail> {
    let order = find_accessible(db, actor, public_id).await?;
    load_detail(db, order).await
}

/// Orders visible to the actor, newest first: all of them for staff, otherwise their own.
pub async fn list_orders(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<OrderDetail>> {
    let mut query = Order::find();
    if !actor.is_staff {
        query = query.filter(order::Column::UserId.eq(actor.user_id));
    }
    let orders = query
        .order_by_desc(order::Column::CreationDate)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    load_details(db, orders).await
}

/// Deletes an unpaid order and returns its snacks to stock.
///
/// # Errors
/// Returns [`Error::AlreadyPaid`] if the order has a final payment.
pub async fn delete_order(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    public_id: Uuid,
) -> Result<()> {
    let txn = db.begin().await?;
    let order = find_accessible(&txn, actor, public_id).await?;
    if order.final_payment.is_some() {
        return Err(Error::AlreadyPaid);
    }

    let snack_lines = BuySnack::find()
        .filter(buy_snack::Column::OrderId.eq(order.id))
        .all(&txn)
        .await?;
    for line in &snack_lines {
        stock::release(&txn, line.snack_id, line.quantity).await?;
    }

    BuySnack::delete_many()
        .filter(buy_snack::Column::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    BuyIngredient::delete_many()
        .filter(buy_ingredient::Column::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Order::delete_by_id(order.id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Order {} deleted by user {}, {} snack line(s) restocked",
        public_id,
        actor.user_id,
        snack_lines.len()
    );
    publisher.publish(&order_topics(!snack_lines.is_empty()));
    Ok(())
}

/// Marks an order as handed over.
pub async fn mark_fulfilled(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    public_id: Uuid,
) -> Result<OrderDetail> {
    actor.require_staff()?;

    let order = find_by_public_id(db, public_id)
        .await?
        .ok_or_else(|| Error::not_found("order", public_id))?;
    let mut active: order::ActiveModel = order.into();
    active.fulfilled = Set(true);
    let order = active.update(db).await?;

    info!("Order {} fulfilled", public_id);
    publisher.publish(&Topic::ORDERS);
    load_detail(db, order).await
}

/// Records the final payment of an order.
///
/// Snack-only orders need no kitchen work, so paying them also fulfills and hides them.
///
/// # Errors
/// Returns [`Error::AlreadyPaid`] if the order was paid before.
pub async fn mark_paid(
    db: &DatabaseConnection,
    publisher: &dyn Publisher,
    actor: &Actor,
    public_id: Uuid,
) -> Result<OrderDetail> {
    actor.require_staff()?;

    let txn = db.begin().await?;
    let order = find_by_public_id(&txn, public_id)
        .await?
        .ok_or_else(|| Error::not_found("order", public_id))?;
    if order.final_payment.is_some() {
        return Err(Error::AlreadyPaid);
    }

    let lunch_lines = BuyIngredient::find()
        .filter(buy_ingredient::Column::OrderId.eq(order.id))
        .count(&txn)
        .await?;

    let mut active: order::ActiveModel = order.into();
    active.final_payment = Set(Some(Utc::now()));
    if lunch_lines == 0 {
        active.fulfilled = Set(true);
        active.hidden = Set(true);
    }
    let order = active.update(&txn).await?;
    txn.commit().await?;

    info!("Order {} paid: {}", public_id, money(order.amount_due));
    publisher.publish(&Topic::ORDERS);
    load_detail(db, order).await
}

/// Unfulfilled orders of a staff queue, oldest first.
pub async fn live_orders(db: &DatabaseConnection, queue: Queue) -> Result<Vec<LiveOrder>> {
    let orders = Order::find()
        .filter(order::Column::Fulfilled.eq(false))
        .order_by_asc(order::Column::CreationDate)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await?;

    Ok(load_details(db, orders)
        .await?
        .iter()
        .filter(|detail| match queue {
            Queue::All => true,
            Queue::SnackOnly => detail.lunch.is_empty(),
            Queue::Lunch => !detail.lunch.is_empty(),
        })
        .map(OrderDetail::to_live)
        .collect())
}

async fn load_detail(db: &DatabaseConnection, order: order::Model) -> Result<OrderDetail> {
    load_details(db, vec![order])
        .await?
        .pop()
        .ok_or_else(|| Error::Internal {
            message: "order detail went missing while loading".to_string(),
        })
}

/// Builds detail views for `orders`, keeping their order, with a fixed number of
/// queries. Lines keep showing snacks and ingredients that were deleted since.
async fn load_details(db: &DatabaseConnection, orders: Vec<order::Model>) -> Result<Vec<OrderDetail>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();

    let snack_lines = BuySnack::find()
        .filter(buy_snack::Column::OrderId.is_in(order_ids.clone()))
        .order_by_asc(buy_snack::Column::Id)
        .all(db)
        .await?;
    let lunch_lines = BuyIngredient::find()
        .filter(buy_ingredient::Column::OrderId.is_in(order_ids))
        .order_by_asc(buy_ingredient::Column::Id)
        .all(db)
        .await?;

    let snack_names: HashMap<i64, String> = Snack::find_including_deleted()
        .filter(
            crate::entities::snack::Column::Id
                .is_in(snack_lines.iter().map(|l| l.snack_id).collect::<Vec<_>>()),
        )
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let ingredient_names: HashMap<i64, String> = Ingredient::find_including_deleted()
        .filter(
            ingredient::Column::Id
                .is_in(lunch_lines.iter().map(|l| l.ingredient_id).collect::<Vec<_>>()),
        )
        .all(db)
        .await?
        .into_iter()
        .map(|i| (i.id, i.name))
        .collect();
    let dish_days: HashMap<i64, i32> = Dish::find()
        .filter(dish::Column::Id.is_in(lunch_lines.iter().map(|l| l.dish_id).collect::<Vec<_>>()))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d.day))
        .collect();

    let mut details: Vec<OrderDetail> = orders.iter().map(OrderDetail::new).collect();
    let position: HashMap<i64, usize> = orders.iter().enumerate().map(|(i, o)| (o.id, i)).collect();

    for line in snack_lines {
        if let Some(&i) = position.get(&line.order_id) {
            details[i].snacks.push(SnackLineView {
                name: snack_names.get(&line.snack_id).cloned().unwrap_or_default(),
                price: money(line.price_to_purchase),
                quantity: line.quantity,
                total: money(line.price_to_purchase * Decimal::from(line.quantity)),
            });
        }
    }
    for line in lunch_lines {
        if let Some(&i) = position.get(&line.order_id) {
            let units = Decimal::from(line.quantity.unwrap_or(1));
            details[i].lunch.push(LunchLineView {
                day_name: day_name(dish_days.get(&line.dish_id).copied().unwrap_or_default()),
                ingredient: ingredient_names
                    .get(&line.ingredient_id)
                    .cloned()
                    .unwrap_or_default(),
                dish_price: money(line.price_to_purchase_dish),
                ingredient_price: money(line.price_to_purchase_ingredient),
                quantity: line.quantity,
                total: money(line.price_to_purchase_ingredient * units),
            });
        }
    }

    Ok(details)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::snack as snack_entity;
    use crate::live::NullPublisher;
    use crate::test_utils::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    /// 2024-01-01 was a Monday.
    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn saturday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap()
    }

    fn snacks(category: &str, items: &[(&str, i32)]) -> BTreeMap<String, Vec<SnackRequest>> {
        let mut map = BTreeMap::new();
        map.insert(
            category.to_string(),
            items
                .iter()
                .map(|(name, quantity)| SnackRequest {
                    name: (*name).to_string(),
                    quantity: *quantity,
                })
                .collect(),
        );
        map
    }

    fn lunch(names: &[&str]) -> Vec<LunchRequest> {
        names
            .iter()
            .map(|name| LunchRequest {
                ingredient_name: (*name).to_string(),
                quantity: None,
            })
            .collect()
    }

    /// Staff member "kitchen" and the clients "ana" and "ben".
    async fn actors(db: &DatabaseConnection) -> Result<(Actor, Actor, Actor)> {
        let staff = create_test_user(db, "kitchen", true).await?;
        let ana = create_test_user(db, "ana", false).await?;
        let ben = create_test_user(db, "ben", false).await?;
        Ok((
            Actor::staff(staff.id),
            Actor::client(ana.id),
            Actor::client(ben.id),
        ))
    }

    /// Monday dish at 10.00 with A and B in group 1 and C (2.00) as an extra.
    async fn setup_lunch() -> Result<DatabaseConnection> {
        let (db, dish) = setup_with_dish().await?;
        link_test_ingredient(&db, &dish, "A", 1).await?;
        link_test_ingredient(&db, &dish, "B", 1).await?;
        let c = create_test_ingredient(&db, "C", Some(Decimal::new(200, 2))).await?;
        link_existing_ingredient(&db, &dish, &c, 0).await?;
        Ok(db)
    }

    async fn order_count(db: &DatabaseConnection) -> Result<u64> {
        Ok(Order::find().count(db).await?)
    }

    #[tokio::test]
    async fn test_cart_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let staff = Actor::staff(1);

        let result = create_order(&db, &NullPublisher, &staff, NewOrder::default()).await;
        assert!(matches!(result, Err(Error::EmptyCart)));

        let request = NewOrder {
            snacks: snacks("Drinks", &[]),
            ..Default::default()
        };
        let result = create_order(&db, &NullPublisher, &staff, request).await;
        assert!(matches!(result, Err(Error::EmptyCart)));

        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 0)]),
            ..Default::default()
        };
        let result = create_order(&db, &NullPublisher, &staff, request).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 1), ("Cola", 2)]),
            ..Default::default()
        };
        let result = create_order(&db, &NullPublisher, &staff, request).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let request = NewOrder {
            lunch: vec![LunchRequest {
                ingredient_name: "A".to_string(),
                quantity: Some(0),
            }],
            ..Default::default()
        };
        let result = create_order(&db, &NullPublisher, &staff, request).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_lunch_with_extra() -> Result<()> {
        let db = setup_lunch().await?;
        let (_staff, ana, _ben) = actors(&db).await?;
        let request = NewOrder {
            lunch: lunch(&["A", "C"]),
            ..Default::default()
        };

        let order = create_order_at(&db, &NullPublisher, &ana, request, monday()).await?;

        assert_eq!(order.amount_lunch, Decimal::new(1200, 2));
        assert_eq!(order.amount_snacks, Decimal::ZERO);
        assert_eq!(order.amount_due, Decimal::new(1200, 2));
        assert_eq!(order.lunch.len(), 2);
        assert!(order.lunch.iter().all(|l| l.day_name == "Monday"));
        assert_eq!(order.user_id, ana.user_id);
        assert_eq!(order.creator_id, ana.user_id);

        Ok(())
    }

    #[tokio::test]
    async fn test_choice_conflict() -> Result<()> {
        let db = setup_lunch().await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let request = NewOrder {
            lunch: lunch(&["A", "B"]),
            ..Default::default()
        };

        let result = create_order_at(&db, &NullPublisher, &staff, request, monday()).await;

        assert!(matches!(
            result,
            Err(Error::ChoiceConflict { group: 1, ref ingredient }) if ingredient == "B"
        ));
        assert_eq!(order_count(&db).await?, 0);
        assert_eq!(BuyIngredient::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_quantified_extras() -> Result<()> {
        let db = setup_lunch().await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let request = NewOrder {
            lunch: vec![
                LunchRequest {
                    ingredient_name: "C".to_string(),
                    quantity: Some(3),
                },
                LunchRequest {
                    ingredient_name: "B".to_string(),
                    quantity: None,
                },
            ],
            ..Default::default()
        };

        let order = create_order_at(&db, &NullPublisher, &staff, request, monday()).await?;

        // 10.00 base + 3 x 2.00
        assert_eq!(order.amount_lunch, Decimal::new(1600, 2));
        let extra = order.lunch.iter().find(|l| l.ingredient == "C").unwrap();
        assert_eq!(extra.total, Decimal::new(600, 2));
        assert_eq!(extra.quantity, Some(3));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_items() -> Result<()> {
        let db = setup_lunch().await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let category = create_test_category(&db, "Drinks", 1).await?;
        create_test_snack(&db, &category, "Cola", 5, Decimal::new(350, 2)).await?;

        let request = NewOrder {
            lunch: lunch(&["Tofu"]),
            ..Default::default()
        };
        let result = create_order_at(&db, &NullPublisher, &staff, request, monday()).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "ingredient",
                ..
            })
        ));

        let request = NewOrder {
            snacks: snacks("Sweets", &[("Cola", 1)]),
            ..Default::default()
        };
        let result = create_order_at(&db, &NullPublisher, &staff, request, monday()).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "snack",
                ..
            })
        ));

        assert_eq!(order_count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_dish_today() -> Result<()> {
        let db = setup_lunch().await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let request = NewOrder {
            lunch: lunch(&["A"]),
            ..Default::default()
        };

        let result = create_order_at(&db, &NullPublisher, &staff, request, saturday()).await;

        assert!(matches!(result, Err(Error::CatalogNotFound { day: 6 })));
        assert_eq!(order_count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_snacks_only_on_a_day_without_dish() -> Result<()> {
        let (db, _category, cola) = setup_with_snack("Cola", 5).await?;
        let (_staff, ana, _ben) = actors(&db).await?;
        let publisher = RecordingPublisher::default();
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 2)]),
            description: Some("No ice".to_string()),
            ..Default::default()
        };

        let order = create_order_at(&db, &publisher, &ana, request, saturday()).await?;

        assert_eq!(order.amount_snacks, Decimal::new(700, 2));
        assert_eq!(order.amount_lunch, Decimal::ZERO);
        assert_eq!(order.snacks[0].total.to_string(), "7.00");
        assert_eq!(order.description.as_deref(), Some("No ice"));
        assert_eq!(stock::stock_level(&db, cola.id).await?, 3);

        // One notification per call, covering the queues and the stock.
        let calls = publisher.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains(&Topic::SnackStock));
        assert!(calls[0].contains(&Topic::AllOrders));

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_last_unit_goes_to_one_order() -> Result<()> {
        let (db, path) = setup_file_test_db().await?;
        let (_staff, ana, ben) = actors(&db).await?;
        let category = create_test_category(&db, "Drinks", 1).await?;
        let db = Arc::new(db);

        for round in 0..5 {
            let name = format!("Cola {round}");
            let cola = create_test_snack(&db, &category, &name, 1, Decimal::new(350, 2)).await?;
            let request = NewOrder {
                snacks: snacks("Drinks", &[(name.as_str(), 1)]),
                ..Default::default()
            };

            let spawn_order = |actor: Actor| {
                let db = Arc::clone(&db);
                let request = request.clone();
                tokio::spawn(async move { create_order(&db, &NullPublisher, &actor, request).await })
            };
            let first = spawn_order(ana);
            let second = spawn_order(ben);
            let results = [first.await.unwrap(), second.await.unwrap()];

            let placed: Vec<&OrderDetail> =
                results.iter().filter_map(|r| r.as_ref().ok()).collect();
            assert_eq!(placed.len(), 1);
            assert_eq!(placed[0].amount_snacks, Decimal::new(350, 2));
            assert!(
                results
                    .iter()
                    .any(|r| matches!(r, Err(Error::InsufficientStock { available: 0, .. })))
            );
            assert_eq!(stock::stock_level(&*db, cola.id).await?, 0);
        }
        assert_eq!(order_count(&db).await?, 5);

        drop(db);
        let _ = std::fs::remove_file(path);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_earlier_reservations() -> Result<()> {
        let (db, category, cola) = setup_with_snack("Cola", 5).await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let water = create_test_snack(&db, &category, "Water", 2, Decimal::ONE).await?;
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 1), ("Water", 10)]),
            ..Default::default()
        };

        let result = create_order(&db, &NullPublisher, &staff, request).await;

        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
        assert_eq!(stock::stock_level(&db, cola.id).await?, 5);
        assert_eq!(stock::stock_level(&db, water.id).await?, 2);
        assert_eq!(order_count(&db).await?, 0);
        assert_eq!(BuySnack::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_amount_due_matches_lines() -> Result<()> {
        let db = setup_lunch().await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let category = create_test_category(&db, "Drinks", 1).await?;
        create_test_snack(&db, &category, "Cola", 5, Decimal::new(350, 2)).await?;
        create_test_snack(&db, &category, "Water", 5, Decimal::new(125, 2)).await?;
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 2), ("Water", 3)]),
            lunch: lunch(&["B", "C"]),
            ..Default::default()
        };

        let order = create_order_at(&db, &NullPublisher, &staff, request, monday()).await?;

        let snack_sum: Decimal = order.snacks.iter().map(|l| l.total).sum();
        let lunch_sum: Decimal = order.lunch.iter().map(|l| l.total).sum();
        assert_eq!(order.amount_snacks, snack_sum);
        assert_eq!(order.amount_snacks, Decimal::new(1075, 2));
        assert_eq!(order.amount_lunch, order.lunch[0].dish_price + lunch_sum);
        assert_eq!(order.amount_due, order.amount_snacks + order.amount_lunch);
        assert_eq!(order.amount_due.to_string(), "22.75");

        Ok(())
    }

    #[tokio::test]
    async fn test_prices_are_snapshots() -> Result<()> {
        let (db, _category, cola) = setup_with_snack("Cola", 5).await?;
        let (staff, _ana, _ben) = actors(&db).await?;
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 1)]),
            ..Default::default()
        };
        let placed = create_order(&db, &NullPublisher, &staff, request).await?;

        let mut active: snack_entity::ActiveModel = cola.into();
        active.price = Set(Decimal::new(900, 2));
        active.deletion_date = Set(Some(Utc::now()));
        active.update(&db).await?;

        let order = get_order(&db, &staff, placed.public_id).await?;
        assert_eq!(order.snacks[0].price, Decimal::new(350, 2));
        assert_eq!(order.snacks[0].name, "Cola");

        Ok(())
    }

    #[tokio::test]
    async fn test_on_behalf_of() -> Result<()> {
        let (db, _category, _cola) = setup_with_snack("Cola", 5).await?;
        let (staff, ana, ben) = actors(&db).await?;
        let request = |name: &str| NewOrder {
            on_behalf_of: Some(name.to_string()),
            snacks: snacks("Drinks", &[("Cola", 1)]),
            ..Default::default()
        };

        let order = create_order(&db, &NullPublisher, &staff, request("ana")).await?;
        assert_eq!(order.user_id, ana.user_id);
        assert_eq!(order.creator_id, staff.user_id);

        // A client cannot place orders for others; the target is ignored.
        let order = create_order(&db, &NullPublisher, &ana, request("ben")).await?;
        assert_eq!(order.user_id, ana.user_id);
        assert_ne!(order.user_id, ben.user_id);

        let result = create_order(&db, &NullPublisher, &staff, request("zoe")).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "user", .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_and_list_respect_ownership() -> Result<()> {
        let (db, _category, _cola) = setup_with_snack("Cola", 5).await?;
        let (staff, ana, ben) = actors(&db).await?;
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 1)]),
            ..Default::default()
        };
        let mine = create_order(&db, &NullPublisher, &ana, request.clone()).await?;
        create_order(&db, &NullPublisher, &ben, request).await?;

        let result = get_order(&db, &ben, mine.public_id).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "order", .. })));
        assert_eq!(
            get_order(&db, &staff, mine.public_id).await?.user_id,
            ana.user_id
        );

        assert_eq!(list_orders(&db, &ana).await?.len(), 1);
        let all = list_orders(&db, &staff).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, ben.user_id);

        // Reading twice without a change is stable.
        let first = serde_json::to_string(&get_order(&db, &staff, mine.public_id).await?)?;
        let second = serde_json::to_string(&get_order(&db, &staff, mine.public_id).await?)?;
        assert_eq!(first, second);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_restores_stock() -> Result<()> {
        let (db, _category, cola) = setup_with_snack("Cola", 5).await?;
        let (_staff, ana, ben) = actors(&db).await?;
        let publisher = RecordingPublisher::default();
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 4)]),
            ..Default::default()
        };
        let order = create_order(&db, &publisher, &ana, request).await?;
        assert_eq!(stock::stock_level(&db, cola.id).await?, 1);

        let result = delete_order(&db, &publisher, &ben, order.public_id).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        delete_order(&db, &publisher, &ana, order.public_id).await?;

        assert_eq!(stock::stock_level(&db, cola.id).await?, 5);
        assert_eq!(order_count(&db).await?, 0);
        assert_eq!(BuySnack::find().count(&db).await?, 0);
        assert_eq!(publisher.calls().len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_paid_order_cannot_be_deleted_or_paid_again() -> Result<()> {
        let (db, _category, cola) = setup_with_snack("Cola", 5).await?;
        let (staff, ana, _ben) = actors(&db).await?;
        let request = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 2)]),
            ..Default::default()
        };
        let order = create_order(&db, &NullPublisher, &ana, request).await?;

        let result = mark_paid(&db, &NullPublisher, &ana, order.public_id).await;
        assert!(matches!(result, Err(Error::Forbidden)));

        let paid = mark_paid(&db, &NullPublisher, &staff, order.public_id).await?;
        assert!(paid.final_payment.is_some());
        // Snack-only orders leave the kitchen queue once paid.
        assert!(paid.fulfilled);
        assert!(paid.hidden);

        let result = delete_order(&db, &NullPublisher, &ana, order.public_id).await;
        assert!(matches!(result, Err(Error::AlreadyPaid)));
        let result = mark_paid(&db, &NullPublisher, &staff, order.public_id).await;
        assert!(matches!(result, Err(Error::AlreadyPaid)));
        assert_eq!(stock::stock_level(&db, cola.id).await?, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_lunch_order_stays_queued_until_fulfilled() -> Result<()> {
        let db = setup_lunch().await?;
        let (staff, ana, ben) = actors(&db).await?;
        let category = create_test_category(&db, "Drinks", 1).await?;
        create_test_snack(&db, &category, "Cola", 5, Decimal::new(350, 2)).await?;

        let lunch_order = NewOrder {
            lunch: lunch(&["A"]),
            ..Default::default()
        };
        let lunch_order = create_order_at(&db, &NullPublisher, &ana, lunch_order, monday()).await?;
        let snack_order = NewOrder {
            snacks: snacks("Drinks", &[("Cola", 1)]),
            ..Default::default()
        };
        create_order_at(&db, &NullPublisher, &ben, snack_order, monday()).await?;

        assert_eq!(live_orders(&db, Queue::All).await?.len(), 2);
        assert_eq!(live_orders(&db, Queue::SnackOnly).await?.len(), 1);
        let queued = live_orders(&db, Queue::Lunch).await?;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].public_id, lunch_order.public_id);

        let paid = mark_paid(&db, &NullPublisher, &staff, lunch_order.public_id).await?;
        assert!(!paid.fulfilled);
        assert_eq!(live_orders(&db, Queue::Lunch).await?.len(), 1);

        let done = mark_fulfilled(&db, &NullPublisher, &staff, lunch_order.public_id).await?;
        assert!(done.fulfilled);
        assert!(!done.hidden);
        assert!(live_orders(&db, Queue::Lunch).await?.is_empty());

        Ok(())
    }
}

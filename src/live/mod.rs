//! Live change notifications for staff screens.
//!
//! After a catalog, stock or order mutation commits, the core calls
//! [`Publisher::publish`] once with the topics whose view changed. The production
//! publisher, [`LiveFeed`], re-renders the full view of each topic and pushes it to every
//! subscriber through the [`Hub`]. Delivery never blocks the mutating call.

/// Per-topic rendering workers and the staff-only subscription gate
pub mod feed;
/// Topic to subscriber fan-out with explicit subscribe/unsubscribe
pub mod hub;

pub use feed::{LiveFeed, render_topic};
pub use hub::{Hub, Snapshot, Subscription};

use serde::Serialize;
use std::sync::Arc;

/// A live view that subscribers can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Topic {
    /// Active categories with their active snacks and stock levels
    SnackStock,
    /// The weekday dishes with their active ingredients
    LunchMenu,
    /// Every unfulfilled order
    AllOrders,
    /// Unfulfilled orders without lunch lines
    SnackOnlyOrders,
    /// Unfulfilled orders with at least one lunch line
    LunchOrders,
}

impl Topic {
    /// Every topic, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::SnackStock,
        Self::LunchMenu,
        Self::AllOrders,
        Self::SnackOnlyOrders,
        Self::LunchOrders,
    ];

    /// The order queues; any order mutation touches all of them.
    pub const ORDERS: [Self; 3] = [Self::AllOrders, Self::SnackOnlyOrders, Self::LunchOrders];

    /// Name used on the wire (e.g. as the websocket route suffix).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SnackStock => "snacks",
            Self::LunchMenu => "lunch",
            Self::AllOrders => "orders",
            Self::SnackOnlyOrders => "orders/snacks",
            Self::LunchOrders => "orders/lunch",
        }
    }
}

/// Receives "this view changed" signals from committed mutations.
///
/// Implementations must return quickly: the caller is still inside a request.
pub trait Publisher: Send + Sync {
    /// Signals that the views of `topics` changed.
    fn publish(&self, topics: &[Topic]);
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, topics: &[Topic]) {
        (**self).publish(topics);
    }
}

/// A publisher that drops every signal (seeding, batch jobs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&self, _topics: &[Topic]) {}
}

//! Per-topic rendering workers.
//!
//! Every topic has one worker task and one [`Notify`] waker. [`LiveFeed::publish`] only
//! wakes the workers, so the mutating request returns immediately. A worker renders the
//! whole current view of its topic from the database and broadcasts it. Wake-ups that
//! arrive while a render is running collapse into one follow-up render, which keeps
//! rendering serial per topic and the last push always the newest state.

use super::{Hub, Publisher, Subscription, Topic};
use crate::{
    auth::{Actor, AuthFailure, CloseCode},
    core::{catalog, order, snack},
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Renders the full current view of `topic` as JSON.
pub async fn render_topic(db: &DatabaseConnection, topic: Topic) -> Result<serde_json::Value> {
    let value = match topic {
        Topic::SnackStock => serde_json::to_value(snack::stock_view(db).await?)?,
        Topic::LunchMenu => serde_json::to_value(catalog::week_menu(db).await?)?,
        Topic::AllOrders => serde_json::to_value(order::live_orders(db, order::Queue::All).await?)?,
        Topic::SnackOnlyOrders => {
            serde_json::to_value(order::live_orders(db, order::Queue::SnackOnly).await?)?
        }
        Topic::LunchOrders => {
            serde_json::to_value(order::live_orders(db, order::Queue::Lunch).await?)?
        }
    };
    Ok(value)
}

/// The production [`Publisher`]: renders and fans out views on change.
#[derive(Debug)]
pub struct LiveFeed {
    db: Arc<DatabaseConnection>,
    hub: Arc<Hub>,
    wakers: HashMap<Topic, Arc<Notify>>,
    workers: Vec<JoinHandle<()>>,
}

impl LiveFeed {
    /// Starts one worker per topic on the current Tokio runtime.
    #[must_use]
    pub fn start(db: DatabaseConnection, hub: Arc<Hub>) -> Self {
        let db = Arc::new(db);
        let mut wakers = HashMap::new();
        let mut workers = Vec::new();

        for topic in Topic::ALL {
            let waker = Arc::new(Notify::new());
            wakers.insert(topic, Arc::clone(&waker));
            workers.push(tokio::spawn(run_worker(
                Arc::clone(&db),
                Arc::clone(&hub),
                topic,
                waker,
            )));
        }

        Self {
            db,
            hub,
            wakers,
            workers,
        }
    }

    /// The connection the workers render from.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The hub subscribers are registered with.
    #[must_use]
    pub const fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Subscribes a resolved actor to `topic`.
    ///
    /// Only staff may watch the live views; anyone else is turned away with
    /// [`CloseCode::Unauthorized`]. On success the topic is re-rendered so the new
    /// subscriber receives the current state right away.
    pub fn subscribe(&self, actor: &Actor, topic: Topic) -> std::result::Result<Subscription, CloseCode> {
        if !actor.is_staff {
            warn!(
                "User {} is not allowed to watch {}",
                actor.user_id,
                topic.name()
            );
            return Err(CloseCode::Unauthorized);
        }

        let subscription = self.hub.subscribe(topic);
        self.publish(&[topic]);
        Ok(subscription)
    }

    /// Subscribes with the raw outcome of the auth collaborator.
    pub fn subscribe_with(
        &self,
        auth: std::result::Result<Actor, AuthFailure>,
        topic: Topic,
    ) -> std::result::Result<Subscription, CloseCode> {
        let actor = auth.map_err(CloseCode::from)?;
        self.subscribe(&actor, topic)
    }
}

impl Publisher for LiveFeed {
    fn publish(&self, topics: &[Topic]) {
        for topic in topics {
            if let Some(waker) = self.wakers.get(topic) {
                waker.notify_one();
            }
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

async fn run_worker(
    db: Arc<DatabaseConnection>,
    hub: Arc<Hub>,
    topic: Topic,
    waker: Arc<Notify>,
) {
    loop {
        waker.notified().await;

        if hub.subscriber_count(topic) == 0 {
            continue;
        }

        match render_topic(&db, topic).await {
            Ok(value) => {
                let delivered = hub.broadcast(topic, &Arc::new(value));
                debug!("Pushed {} to {} subscriber(s)", topic.name(), delivered);
            }
            Err(e) => error!("Failed to render live view {}: {}", topic.name(), e),
        }
    }
}

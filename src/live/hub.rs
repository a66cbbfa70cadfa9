//! Topic fan-out.
//!
//! Each subscriber owns a single "latest value" slot (a `watch` channel). Broadcasting
//! overwrites the slot, so a slow subscriber skips intermediate states but always ends up
//! with the newest one. Dropping a [`Subscription`] removes it from its topic; slots whose
//! receiver is gone are also pruned on the next broadcast.

use super::Topic;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, trace};

/// A rendered view as pushed to subscribers.
pub type Snapshot = Arc<serde_json::Value>;

type Slot = watch::Sender<Option<Snapshot>>;

/// Registry of live subscribers per topic.
#[derive(Debug, Default)]
pub struct Hub {
    next_id: AtomicU64,
    topics: Mutex<HashMap<Topic, HashMap<u64, Slot>>>,
}

impl Hub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, HashMap<u64, Slot>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new subscriber for `topic`.
    ///
    /// The subscription starts empty; the caller is responsible for triggering a push of
    /// the current state.
    pub fn subscribe(self: &Arc<Self>, topic: Topic) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        self.topics().entry(topic).or_default().insert(id, tx);
        debug!("Subscriber {} joined topic {}", id, topic.name());

        Subscription {
            id,
            topic,
            rx,
            hub: Arc::downgrade(self),
        }
    }

    /// Removes a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, topic: Topic, id: u64) -> bool {
        let removed = self
            .topics()
            .get_mut(&topic)
            .and_then(|subscribers| subscribers.remove(&id))
            .is_some();
        if removed {
            debug!("Subscriber {} left topic {}", id, topic.name());
        }
        removed
    }

    /// Pushes `snapshot` to every subscriber of `topic`. Returns how many received it.
    pub fn broadcast(&self, topic: Topic, snapshot: &Snapshot) -> usize {
        let mut topics = self.topics();
        let Some(subscribers) = topics.get_mut(&topic) else {
            return 0;
        };

        subscribers.retain(|_, slot| !slot.is_closed());
        for slot in subscribers.values() {
            slot.send_replace(Some(Arc::clone(snapshot)));
        }

        trace!(
            "Broadcast on {} reached {} subscriber(s)",
            topic.name(),
            subscribers.len()
        );
        subscribers.len()
    }

    /// Number of registered subscribers of `topic`.
    #[must_use]
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topics().get(&topic).map_or(0, HashMap::len)
    }
}

/// A live subscription to one topic. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: Topic,
    rx: watch::Receiver<Option<Snapshot>>,
    hub: Weak<Hub>,
}

impl Subscription {
    /// The subscriber id within its topic.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The followed topic.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Waits for the next snapshot not yet seen by this subscriber.
    ///
    /// Returns `None` once the subscription has been removed from the hub.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }

    /// The most recent snapshot, if any was pushed yet.
    #[must_use]
    pub fn latest(&self) -> Option<Snapshot> {
        self.rx.borrow().clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.topic, self.id);
        }
    }
}

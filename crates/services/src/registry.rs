use std::collections::HashMap;

use parking_lot::Mutex;

use crate::subscriber::{Subscriber, SubscriberId};

/// Outcome of visiting one subscriber during [`SubscriberRegistry::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Remove,
}

/// Set of active subscribers, guarded by a single lock.
///
/// Every operation takes the same mutex, so no caller can observe a
/// half-applied add or remove. Enumeration works over a snapshot copied
/// under the lock; removals requested while enumerating are applied after
/// the snapshot has been walked.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    members: Mutex<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the subscriber. Adding the same identity twice keeps one entry.
    pub fn add(&self, subscriber: Subscriber) {
        let id = subscriber.id();
        let remote = subscriber.remote();
        let total = {
            let mut members = self.members.lock();
            members.insert(id, subscriber);
            members.len()
        };
        tracing::info!(%id, ?remote, total, "🔌 Subscriber registered");
    }

    /// Removes the subscriber and closes its channel.
    ///
    /// Returns `false` when it was already gone; the call is then a no-op.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.members.lock().remove(&id);
        match removed {
            Some(subscriber) => {
                subscriber.close();
                tracing::info!(%id, remote = ?subscriber.remote(), "👋 Subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of all members.
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.members.lock().values().cloned().collect()
    }

    /// Visits a snapshot, then removes every member `f` returned
    /// [`Visit::Remove`] for. Returns the number removed by this call.
    pub fn for_each<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&Subscriber) -> Visit,
    {
        let doomed: Vec<SubscriberId> = self
            .snapshot()
            .iter()
            .filter(|subscriber| f(*subscriber) == Visit::Remove)
            .map(Subscriber::id)
            .collect();

        self.remove_all(&doomed)
    }

    /// Removes each listed id, returning how many were still present.
    pub fn remove_all(&self, ids: &[SubscriberId]) -> usize {
        ids.iter().filter(|id| self.remove(**id)).count()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Drains the registry, closing every channel. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Subscriber> = self.members.lock().drain().map(|(_, s)| s).collect();
        for subscriber in &drained {
            subscriber.close();
        }
        drained.len()
    }
}

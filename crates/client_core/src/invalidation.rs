//! Cross-view invalidation bus.
//!
//! Mutating flows publish a typed [`Invalidation`] after a successful write. Every mounted view
//! holds an [`InvalidationSubscription`] registered with an [`Interest`]; matching events are
//! queued on the subscription and coalesced, so a view refreshes once per settle no matter how
//! many events landed before it looked.

use std::{
    mem,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use futures::Stream;
use parking_lot::Mutex;
use shared::domain::{CardId, DeckId};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    DeckMutated(DeckId),
    CardMutated { deck_id: DeckId, card_id: CardId },
    Everything,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interest {
    DeckList,
    Deck(DeckId),
    Card(CardId),
}

impl Interest {
    pub fn matches(&self, event: &Invalidation) -> bool {
        match (self, event) {
            (_, Invalidation::Everything) | (Interest::DeckList, _) => true,
            (Interest::Deck(id), Invalidation::DeckMutated(deck_id)) => id == deck_id,
            (Interest::Deck(id), Invalidation::CardMutated { deck_id, .. }) => id == deck_id,
            (Interest::Card(id), Invalidation::CardMutated { card_id, .. }) => id == card_id,
            (Interest::Card(_), Invalidation::DeckMutated(_)) => false,
        }
    }
}

struct Slot {
    interest: Mutex<Interest>,
    pending: Mutex<Vec<Invalidation>>,
    notify: Notify,
}

impl Slot {
    fn offer(&self, event: Invalidation) -> bool {
        if !self.interest.lock().matches(&event) {
            return false;
        }
        let mut pending = self.pending.lock();
        if !pending.contains(&event) {
            pending.push(event);
        }
        drop(pending);
        // At most one stored permit: a burst of events wakes the subscriber once.
        self.notify.notify_one();
        true
    }

    fn take(&self) -> Option<Vec<Invalidation>> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            None
        } else {
            Some(mem::take(&mut *pending))
        }
    }
}

#[derive(Default)]
struct Registry {
    slots: Mutex<Vec<Weak<Slot>>>,
    epoch: AtomicU64,
}

/// Cheap to clone; every clone publishes into the same registry.
#[derive(Clone, Default)]
pub struct InvalidationBus {
    registry: Arc<Registry>,
}

impl InvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, interest: Interest) -> InvalidationSubscription {
        let slot = Arc::new(Slot {
            interest: Mutex::new(interest),
            pending: Mutex::new(Vec::new()),
            notify: Notify::new(),
        });
        self.registry.slots.lock().push(Arc::downgrade(&slot));
        InvalidationSubscription { slot }
    }

    /// Queues `event` on every live subscription whose interest matches it.
    /// Returns how many subscriptions were notified.
    pub fn publish(&self, event: Invalidation) -> usize {
        let epoch = self.registry.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slots = self.registry.slots.lock();
        slots.retain(|slot| slot.strong_count() > 0);
        let notified = slots
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|slot| slot.offer(event))
            .count();
        debug!(?event, epoch, notified, "published invalidation");
        notified
    }

    /// Invalidates every subscriber regardless of interest.
    pub fn toggle(&self) -> usize {
        self.publish(Invalidation::Everything)
    }

    /// Number of invalidations published so far.
    pub fn epoch(&self) -> u64 {
        self.registry.epoch.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        let mut slots = self.registry.slots.lock();
        slots.retain(|slot| slot.strong_count() > 0);
        slots.len()
    }
}

/// A view's registration on the bus. Dropping it unregisters the view.
pub struct InvalidationSubscription {
    slot: Arc<Slot>,
}

impl InvalidationSubscription {
    pub fn interest(&self) -> Interest {
        *self.slot.interest.lock()
    }

    /// Re-targets the subscription, e.g. when the view's deck key changes.
    /// Events queued for the previous interest are dropped.
    pub fn retarget(&self, interest: Interest) {
        *self.slot.interest.lock() = interest;
        self.slot.pending.lock().clear();
    }

    /// Drains the queued batch without waiting.
    pub fn try_take(&self) -> Option<Vec<Invalidation>> {
        self.slot.take()
    }

    /// Waits for the next batch of matching invalidations.
    pub async fn changed(&self) -> Vec<Invalidation> {
        loop {
            if let Some(batch) = self.slot.take() {
                return batch;
            }
            self.slot.notify.notified().await;
        }
    }

    /// The subscription as a stream of coalesced batches.
    pub fn into_stream(self) -> impl Stream<Item = Vec<Invalidation>> {
        futures::stream::unfold(self, |subscription| async move {
            let batch = subscription.changed().await;
            Some((batch, subscription))
        })
    }
}

#[cfg(test)]
#[path = "tests/invalidation_tests.rs"]
mod tests;

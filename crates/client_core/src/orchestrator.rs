//! Screen-level synchronization of remote deck state.
//!
//! A [`SyncedView`] owns one key at a time. Mounting (or re-keying) resets the published state
//! to [`Loadable::Loading`], points the view's invalidation interest at the new key and issues a
//! guarded read. The mounted key and the guard's lifecycle change together under the key lock. Each coalesced batch of invalidations triggers exactly one re-read.

use std::{fmt::Debug, sync::Arc};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::domain::{Card, CardId, Deck, DeckId};
use tokio::sync::{watch, Notify};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::{
    api::DeckApi,
    cancel::CancellationToken,
    error::{ClientError, StudyError},
    fetch_guard::{DataFetchGuard, FetchOutcome, FetchTicket},
    invalidation::{Interest, InvalidationBus, InvalidationSubscription},
    mutations::{DeckMutations, DeleteOutcome},
    navigation::{ConfirmPrompt, Navigator},
    study::StudySessionController,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable<T> {
    Loading,
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            Loadable::Loading => None,
        }
    }
}

/// Where a view's data comes from and which invalidations concern it.
#[async_trait]
pub trait ViewSource: Send + Sync + 'static {
    type Key: Clone + PartialEq + Debug + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    fn interest(key: &Self::Key) -> Interest;

    async fn load(
        &self,
        key: Self::Key,
        token: CancellationToken,
    ) -> Result<Self::Value, ClientError>;
}

pub struct DeckListSource {
    api: Arc<dyn DeckApi>,
}

impl DeckListSource {
    pub fn new(api: Arc<dyn DeckApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ViewSource for DeckListSource {
    type Key = ();
    type Value = Vec<Deck>;

    fn interest(_key: &()) -> Interest {
        Interest::DeckList
    }

    async fn load(&self, _key: (), token: CancellationToken) -> Result<Vec<Deck>, ClientError> {
        self.api.list_decks(token).await
    }
}

pub struct DeckSource {
    api: Arc<dyn DeckApi>,
}

impl DeckSource {
    pub fn new(api: Arc<dyn DeckApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ViewSource for DeckSource {
    type Key = DeckId;
    type Value = Deck;

    fn interest(key: &DeckId) -> Interest {
        Interest::Deck(*key)
    }

    async fn load(&self, key: DeckId, token: CancellationToken) -> Result<Deck, ClientError> {
        self.api.read_deck(key, token).await
    }
}

pub struct CardSource {
    api: Arc<dyn DeckApi>,
}

impl CardSource {
    pub fn new(api: Arc<dyn DeckApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ViewSource for CardSource {
    type Key = CardId;
    type Value = Card;

    fn interest(key: &CardId) -> Interest {
        Interest::Card(*key)
    }

    async fn load(&self, key: CardId, token: CancellationToken) -> Result<Card, ClientError> {
        self.api.read_card(key, token).await
    }
}

pub struct SyncedView<S: ViewSource> {
    source: S,
    bus: InvalidationBus,
    guard: DataFetchGuard<S::Key>,
    key: Mutex<Option<S::Key>>,
    subscription: Mutex<Option<Arc<InvalidationSubscription>>>,
    detached: Notify,
    state: watch::Sender<Loadable<S::Value>>,
}

/// Home screen.
pub type DeckListOrchestrator = SyncedView<DeckListSource>;
/// Edit-card screen.
pub type CardView = SyncedView<CardSource>;

impl SyncedView<DeckListSource> {
    pub fn deck_list(api: Arc<dyn DeckApi>, bus: InvalidationBus) -> Self {
        Self::new(DeckListSource::new(api), bus)
    }
}

impl SyncedView<CardSource> {
    pub fn card(api: Arc<dyn DeckApi>, bus: InvalidationBus) -> Self {
        Self::new(CardSource::new(api), bus)
    }
}

impl<S: ViewSource> SyncedView<S> {
    pub fn new(source: S, bus: InvalidationBus) -> Self {
        let (state, _) = watch::channel(Loadable::Loading);
        Self {
            source,
            bus,
            guard: DataFetchGuard::new(),
            key: Mutex::new(None),
            subscription: Mutex::new(None),
            detached: Notify::new(),
            state,
        }
    }

    pub fn current_key(&self) -> Option<S::Key> {
        self.key.lock().clone()
    }

    pub fn snapshot(&self) -> Loadable<S::Value> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Loadable<S::Value>> {
        self.state.subscribe()
    }

    pub fn updates(&self) -> WatchStream<Loadable<S::Value>> {
        WatchStream::new(self.state.subscribe())
    }

    /// Shows `key`. Any read outstanding for the previous key is cancelled and its result,
    /// should it still arrive, is discarded.
    pub async fn mount(&self, key: S::Key) -> Result<FetchOutcome, ClientError> {
        let ticket = {
            let mut mounted = self.key.lock();
            *mounted = Some(key.clone());
            // Opened before the reset, so a late result for the old key cannot land after it.
            let ticket = self.guard.begin(key.clone());
            self.state.send_replace(Loadable::Loading);
            ticket
        };
        self.attach(S::interest(&key));
        self.fetch(ticket).await
    }

    /// Re-reads the mounted key without resetting to `Loading`.
    pub async fn refresh(&self) -> Result<FetchOutcome, ClientError> {
        let ticket = {
            let mounted = self.key.lock();
            let Some(key) = mounted.as_ref() else {
                debug!("refresh skipped: nothing mounted");
                return Ok(FetchOutcome::Cancelled);
            };
            self.guard.begin(key.clone())
        };
        self.fetch(ticket).await
    }

    /// Waits for the next coalesced batch of invalidations and re-reads once.
    /// Returns `None` once the view is unmounted.
    pub async fn next_invalidation(&self) -> Option<Result<FetchOutcome, ClientError>> {
        loop {
            let subscription = self.subscription.lock().clone()?;
            tokio::select! {
                batch = subscription.changed() => {
                    debug!(
                        key = ?self.current_key(),
                        events = batch.len(),
                        "refreshing after invalidation"
                    );
                    return Some(self.refresh().await);
                }
                _ = self.detached.notified() => continue,
            }
        }
    }

    /// Keeps the view in sync until it is unmounted.
    pub async fn watch_invalidations(&self) {
        while let Some(result) = self.next_invalidation().await {
            if let Err(err) = result {
                debug!(error = %err, "refresh after invalidation failed; keeping last state");
            }
        }
    }

    /// Cancels any in-flight read and leaves the bus.
    pub fn unmount(&self) {
        {
            let mut mounted = self.key.lock();
            *mounted = None;
            self.guard.teardown();
        }
        self.subscription.lock().take();
        self.detached.notify_one();
        self.state.send_replace(Loadable::Loading);
    }

    fn attach(&self, interest: Interest) {
        let mut subscription = self.subscription.lock();
        match subscription.as_ref() {
            Some(existing) => existing.retarget(interest),
            None => *subscription = Some(Arc::new(self.bus.subscribe(interest))),
        }
    }

    async fn fetch(&self, ticket: FetchTicket<S::Key>) -> Result<FetchOutcome, ClientError> {
        let state = &self.state;
        let source = &self.source;
        let key = ticket.key.clone();
        self.guard
            .read_with(
                ticket,
                |token| source.load(key, token),
                |value| {
                    state.send_replace(Loadable::Ready(value));
                },
            )
            .await
    }
}

/// Deck detail, edit and study screens.
pub struct DeckViewOrchestrator {
    view: SyncedView<DeckSource>,
    mutations: DeckMutations,
    navigator: Arc<dyn Navigator>,
    confirm: Arc<dyn ConfirmPrompt>,
}

impl DeckViewOrchestrator {
    pub fn new(
        api: Arc<dyn DeckApi>,
        bus: InvalidationBus,
        navigator: Arc<dyn Navigator>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        let mutations = DeckMutations::new(
            Arc::clone(&api),
            bus.clone(),
            Arc::clone(&navigator),
            Arc::clone(&confirm),
        );
        Self {
            view: SyncedView::new(DeckSource::new(api), bus),
            mutations,
            navigator,
            confirm,
        }
    }

    pub fn view(&self) -> &SyncedView<DeckSource> {
        &self.view
    }

    pub fn mutations(&self) -> &DeckMutations {
        &self.mutations
    }

    pub async fn mount(&self, deck_id: DeckId) -> Result<FetchOutcome, ClientError> {
        self.view.mount(deck_id).await
    }

    pub fn unmount(&self) {
        self.view.unmount();
    }

    pub fn deck(&self) -> Option<Deck> {
        self.view.snapshot().ready().cloned()
    }

    /// Starts a study session over the deck as currently shown.
    pub fn start_study(&self) -> Result<StudySessionController, StudyError> {
        let state = self.view.state.borrow();
        let deck = state.ready().ok_or(StudyError::NoDeckLoaded)?;
        Ok(StudySessionController::new(
            deck,
            Arc::clone(&self.navigator),
            Arc::clone(&self.confirm),
        ))
    }

    pub async fn delete_deck(&self) -> Result<DeleteOutcome, ClientError> {
        let deck_id = self.mounted("delete_deck")?;
        let outcome = self.mutations.delete_deck(deck_id).await?;
        if outcome == DeleteOutcome::Deleted {
            self.view.unmount();
        }
        Ok(outcome)
    }

    /// Deletes a card of the shown deck. Cards not in the current snapshot are refused.
    pub async fn delete_card(&self, card_id: CardId) -> Result<DeleteOutcome, ClientError> {
        let deck_id = self.mounted("delete_card")?;
        let card = self
            .deck()
            .and_then(|deck| deck.card(card_id).cloned())
            .ok_or_else(|| {
                ClientError::mutation(
                    "delete_card",
                    anyhow!("card {card_id} is not in deck {deck_id}"),
                )
            })?;
        self.mutations.delete_card(&card).await
    }

    fn mounted(&self, operation: &'static str) -> Result<DeckId, ClientError> {
        self.view
            .current_key()
            .ok_or_else(|| ClientError::mutation(operation, anyhow!("no deck is mounted")))
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;

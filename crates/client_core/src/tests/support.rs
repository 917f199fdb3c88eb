//! In-memory collaborators shared by the client_core tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{
    domain::{Card, CardId, Deck, DeckId},
    error::ApiError,
    protocol::{CardDraft, DeckDraft},
};
use tokio::sync::oneshot;

use crate::{
    api::DeckApi,
    cancel::CancellationToken,
    error::ClientError,
    invalidation::InvalidationBus,
    navigation::{ConfirmPrompt, Navigator, Route},
};

/// Ordered record of what the collaborators saw, for asserting step order.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

pub fn card(id: i64, deck_id: i64, front: &str, back: &str) -> Card {
    Card {
        id: CardId(id),
        deck_id: DeckId(deck_id),
        front: front.to_string(),
        back: back.to_string(),
    }
}

/// A deck with `count` cards whose faces are `Q1`/`A1`, `Q2`/`A2`, ...
pub fn deck_with_cards(id: i64, name: &str, count: usize) -> Deck {
    Deck {
        id: DeckId(id),
        name: name.to_string(),
        description: String::new(),
        cards: (1..=count)
            .map(|n| {
                card(
                    id * 100 + n as i64,
                    id,
                    &format!("Q{n}"),
                    &format!("A{n}"),
                )
            })
            .collect(),
    }
}

#[derive(Default)]
pub struct FakeDeckApi {
    decks: Mutex<Vec<Deck>>,
    next_id: AtomicUsize,
    deck_reads: AtomicUsize,
    list_reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_mutations: AtomicBool,
    gates: Mutex<HashMap<DeckId, oneshot::Receiver<()>>>,
    journal: Journal,
}

impl FakeDeckApi {
    pub fn with_decks(decks: Vec<Deck>) -> Arc<Self> {
        Arc::new(Self {
            decks: Mutex::new(decks),
            next_id: AtomicUsize::new(1000),
            ..Self::default()
        })
    }

    pub fn with_journal(decks: Vec<Deck>, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            decks: Mutex::new(decks),
            next_id: AtomicUsize::new(1000),
            journal,
            ..Self::default()
        })
    }

    /// The next read of `deck_id` waits until the returned sender fires. It ignores its token.
    pub fn hold_next_read(&self, deck_id: DeckId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(deck_id, rx);
        tx
    }

    pub fn deck_reads(&self) -> usize {
        self.deck_reads.load(Ordering::SeqCst)
    }

    pub fn list_reads(&self) -> usize {
        self.list_reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn deck(&self, deck_id: DeckId) -> Option<Deck> {
        self.decks
            .lock()
            .iter()
            .find(|deck| deck.id == deck_id)
            .cloned()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) as i64
    }

    fn check_mutation(&self, operation: &'static str) -> Result<(), ClientError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ClientError::mutation(operation, anyhow!("store unavailable")));
        }
        Ok(())
    }

    fn not_found(operation: &'static str, what: String) -> ClientError {
        ClientError::mutation(operation, ApiError::not_found(what))
    }
}

#[async_trait]
impl DeckApi for FakeDeckApi {
    async fn list_decks(&self, _token: CancellationToken) -> Result<Vec<Deck>, ClientError> {
        self.list_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::read("list_decks", anyhow!("connection refused")));
        }
        Ok(self.decks.lock().clone())
    }

    async fn read_deck(
        &self,
        deck_id: DeckId,
        _token: CancellationToken,
    ) -> Result<Deck, ClientError> {
        self.deck_reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().remove(&deck_id);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::read("read_deck", anyhow!("connection refused")));
        }
        self.deck(deck_id)
            .ok_or_else(|| ClientError::read("read_deck", ApiError::not_found("deck not found")))
    }

    async fn read_card(
        &self,
        card_id: CardId,
        _token: CancellationToken,
    ) -> Result<Card, ClientError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::read("read_card", anyhow!("connection refused")));
        }
        self.decks
            .lock()
            .iter()
            .find_map(|deck| deck.card(card_id).cloned())
            .ok_or_else(|| ClientError::read("read_card", ApiError::not_found("card not found")))
    }

    async fn create_deck(&self, draft: DeckDraft) -> Result<Deck, ClientError> {
        self.check_mutation("create_deck")?;
        let deck = Deck {
            id: DeckId(self.next_id()),
            name: draft.name,
            description: draft.description,
            cards: Vec::new(),
        };
        self.journal.record(format!("api: create_deck {}", deck.id));
        self.decks.lock().push(deck.clone());
        Ok(deck)
    }

    async fn update_deck(&self, deck: Deck) -> Result<Deck, ClientError> {
        self.check_mutation("update_deck")?;
        let mut decks = self.decks.lock();
        let stored = decks
            .iter_mut()
            .find(|stored| stored.id == deck.id)
            .ok_or_else(|| Self::not_found("update_deck", format!("deck {}", deck.id)))?;
        stored.name = deck.name;
        stored.description = deck.description;
        self.journal.record(format!("api: update_deck {}", stored.id));
        Ok(stored.clone())
    }

    async fn delete_deck(&self, deck_id: DeckId) -> Result<(), ClientError> {
        self.check_mutation("delete_deck")?;
        let mut decks = self.decks.lock();
        let before = decks.len();
        decks.retain(|deck| deck.id != deck_id);
        if decks.len() == before {
            return Err(Self::not_found("delete_deck", format!("deck {deck_id}")));
        }
        self.journal.record(format!("api: delete_deck {deck_id}"));
        Ok(())
    }

    async fn create_card(&self, deck_id: DeckId, draft: CardDraft) -> Result<Card, ClientError> {
        self.check_mutation("create_card")?;
        let id = CardId(self.next_id());
        let mut decks = self.decks.lock();
        let deck = decks
            .iter_mut()
            .find(|deck| deck.id == deck_id)
            .ok_or_else(|| Self::not_found("create_card", format!("deck {deck_id}")))?;
        let card = Card {
            id,
            deck_id,
            front: draft.front,
            back: draft.back,
        };
        deck.cards.push(card.clone());
        self.journal.record(format!("api: create_card {id}"));
        Ok(card)
    }

    async fn update_card(&self, card: Card) -> Result<Card, ClientError> {
        self.check_mutation("update_card")?;
        let mut decks = self.decks.lock();
        let stored = decks
            .iter_mut()
            .flat_map(|deck| deck.cards.iter_mut())
            .find(|stored| stored.id == card.id)
            .ok_or_else(|| Self::not_found("update_card", format!("card {}", card.id)))?;
        stored.front = card.front;
        stored.back = card.back;
        self.journal.record(format!("api: update_card {}", stored.id));
        Ok(stored.clone())
    }

    async fn delete_card(&self, card_id: CardId) -> Result<(), ClientError> {
        self.check_mutation("delete_card")?;
        let mut decks = self.decks.lock();
        let mut removed = false;
        for deck in decks.iter_mut() {
            let before = deck.cards.len();
            deck.cards.retain(|card| card.id != card_id);
            removed |= deck.cards.len() != before;
        }
        if !removed {
            return Err(Self::not_found("delete_card", format!("card {card_id}")));
        }
        self.journal.record(format!("api: delete_card {card_id}"));
        Ok(())
    }
}

/// Records every route pushed, along with the bus epoch at the time of the push.
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
    bus: Option<InvalidationBus>,
    journal: Journal,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            bus: None,
            journal: Journal::default(),
        })
    }

    pub fn observing(bus: InvalidationBus, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            bus: Some(bus),
            journal,
        })
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&self, route: Route) {
        let epoch = self.bus.as_ref().map_or(0, InvalidationBus::epoch);
        self.journal.record(format!("navigate {route} (epoch {epoch})"));
        self.routes.lock().push(route);
    }
}

/// Answers prompts from a script; answers `false` once the script runs out.
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    prompts: Mutex<Vec<String>>,
    journal: Journal,
}

impl ScriptedConfirm {
    pub fn answering(answers: impl IntoIterator<Item = bool>) -> Arc<Self> {
        Self::with_journal(answers, Journal::default())
    }

    pub fn with_journal(answers: impl IntoIterator<Item = bool>, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            journal,
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ConfirmPrompt for ScriptedConfirm {
    async fn confirm(&self, message: &str) -> bool {
        let answer = self.answers.lock().pop_front().unwrap_or(false);
        self.prompts.lock().push(message.to_string());
        self.journal.record(format!("confirm -> {answer}"));
        answer
    }
}

//! Mutating flows: write through the API, then invalidate, then navigate.
//!
//! Nothing is published and nobody is moved unless the write succeeded. Deletes are gated on
//! the host's confirmation; a declined prompt issues no request at all.

use std::sync::Arc;

use shared::{
    domain::{Card, Deck, DeckId},
    protocol::{CardDraft, DeckDraft},
};
use tracing::{info, warn};

use crate::{
    api::DeckApi,
    error::ClientError,
    invalidation::{Invalidation, InvalidationBus},
    navigation::{ConfirmPrompt, Navigator, Route, DELETE_CARD_PROMPT, DELETE_DECK_PROMPT},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

#[derive(Clone)]
pub struct DeckMutations {
    api: Arc<dyn DeckApi>,
    bus: InvalidationBus,
    navigator: Arc<dyn Navigator>,
    confirm: Arc<dyn ConfirmPrompt>,
}

impl DeckMutations {
    pub fn new(
        api: Arc<dyn DeckApi>,
        bus: InvalidationBus,
        navigator: Arc<dyn Navigator>,
        confirm: Arc<dyn ConfirmPrompt>,
    ) -> Self {
        Self {
            api,
            bus,
            navigator,
            confirm,
        }
    }

    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    pub async fn create_deck(&self, draft: DeckDraft) -> Result<Deck, ClientError> {
        let deck = self.api.create_deck(draft).await.inspect_err(log_failure)?;
        info!(deck_id = deck.id.0, "deck created");
        self.bus.publish(Invalidation::DeckMutated(deck.id));
        self.navigator.push(Route::Deck(deck.id));
        Ok(deck)
    }

    pub async fn update_deck(&self, deck: Deck) -> Result<Deck, ClientError> {
        let deck = self.api.update_deck(deck).await.inspect_err(log_failure)?;
        info!(deck_id = deck.id.0, "deck updated");
        self.bus.publish(Invalidation::DeckMutated(deck.id));
        self.navigator.push(Route::Deck(deck.id));
        Ok(deck)
    }

    pub async fn delete_deck(&self, deck_id: DeckId) -> Result<DeleteOutcome, ClientError> {
        if !self.confirm.confirm(DELETE_DECK_PROMPT).await {
            info!(deck_id = deck_id.0, "deck delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        self.api
            .delete_deck(deck_id)
            .await
            .inspect_err(log_failure)?;
        info!(deck_id = deck_id.0, "deck deleted");
        self.bus.publish(Invalidation::DeckMutated(deck_id));
        self.navigator.push(Route::Home);
        Ok(DeleteOutcome::Deleted)
    }

    /// Adds a card and stays on the add-card screen so the next one can be entered.
    pub async fn create_card(&self, deck_id: DeckId, draft: CardDraft) -> Result<Card, ClientError> {
        let card = self
            .api
            .create_card(deck_id, draft)
            .await
            .inspect_err(log_failure)?;
        info!(deck_id = deck_id.0, card_id = card.id.0, "card created");
        self.bus.publish(Invalidation::CardMutated {
            deck_id: card.deck_id,
            card_id: card.id,
        });
        Ok(card)
    }

    pub async fn update_card(&self, card: Card) -> Result<Card, ClientError> {
        let card = self.api.update_card(card).await.inspect_err(log_failure)?;
        info!(deck_id = card.deck_id.0, card_id = card.id.0, "card updated");
        self.bus.publish(Invalidation::CardMutated {
            deck_id: card.deck_id,
            card_id: card.id,
        });
        self.navigator.push(Route::Deck(card.deck_id));
        Ok(card)
    }

    /// Confirm, delete, invalidate, then return to the deck that owns `card`.
    pub async fn delete_card(&self, card: &Card) -> Result<DeleteOutcome, ClientError> {
        let (deck_id, card_id) = (card.deck_id, card.id);
        if !self.confirm.confirm(DELETE_CARD_PROMPT).await {
            info!(card_id = card_id.0, "card delete declined");
            return Ok(DeleteOutcome::Declined);
        }
        self.api
            .delete_card(card_id)
            .await
            .inspect_err(log_failure)?;
        info!(deck_id = deck_id.0, card_id = card_id.0, "card deleted");
        self.bus
            .publish(Invalidation::CardMutated { deck_id, card_id });
        self.navigator.push(Route::Deck(deck_id));
        Ok(DeleteOutcome::Deleted)
    }
}

fn log_failure(err: &ClientError) {
    warn!(error = %err, "mutation failed");
}

#[cfg(test)]
#[path = "tests/mutations_tests.rs"]
mod tests;

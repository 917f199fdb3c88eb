//! The deck/card data-access collaborator.

use async_trait::async_trait;
use shared::{
    domain::{Card, CardId, Deck, DeckId},
    protocol::{CardDraft, DeckDraft},
};

use crate::{cancel::CancellationToken, error::ClientError};

/// Reads take a [`CancellationToken`] and resolve to [`ClientError::Cancelled`] when it fires
/// mid-call. Mutations are never cancelled once issued.
#[async_trait]
pub trait DeckApi: Send + Sync {
    async fn list_decks(&self, token: CancellationToken) -> Result<Vec<Deck>, ClientError>;
    async fn read_deck(&self, deck_id: DeckId, token: CancellationToken)
        -> Result<Deck, ClientError>;
    async fn read_card(&self, card_id: CardId, token: CancellationToken)
        -> Result<Card, ClientError>;
    async fn create_deck(&self, draft: DeckDraft) -> Result<Deck, ClientError>;
    async fn update_deck(&self, deck: Deck) -> Result<Deck, ClientError>;
    async fn delete_deck(&self, deck_id: DeckId) -> Result<(), ClientError>;
    async fn create_card(&self, deck_id: DeckId, draft: CardDraft) -> Result<Card, ClientError>;
    async fn update_card(&self, card: Card) -> Result<Card, ClientError>;
    async fn delete_card(&self, card_id: CardId) -> Result<(), ClientError>;
}

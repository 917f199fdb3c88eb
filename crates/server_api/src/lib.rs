use shared::{
    domain::{Card, CardId, Deck, DeckId},
    error::{ApiError, ErrorCode},
    protocol::{CardDraft, DeckDraft},
};
use storage::Storage;
use tracing::info;

const MAX_DECK_NAME_CHARS: usize = 200;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_decks(ctx: &ApiContext) -> Result<Vec<Deck>, ApiError> {
    ctx.storage.list_decks().await.map_err(internal)
}

pub async fn read_deck(ctx: &ApiContext, deck_id: DeckId) -> Result<Deck, ApiError> {
    ctx.storage
        .read_deck(deck_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| deck_not_found(deck_id))
}

pub async fn create_deck(ctx: &ApiContext, draft: DeckDraft) -> Result<Deck, ApiError> {
    let draft = validate_deck_draft(draft)?;
    let deck = ctx.storage.create_deck(&draft).await.map_err(internal)?;
    info!(deck_id = deck.id.0, name = %deck.name, "created deck");
    Ok(deck)
}

/// Replaces the deck's own fields. Cards in `deck` are ignored; they change through card routes.
pub async fn update_deck(
    ctx: &ApiContext,
    deck_id: DeckId,
    deck: Deck,
) -> Result<Deck, ApiError> {
    if deck.id != deck_id {
        return Err(ApiError::validation(format!(
            "deck id {} does not match path id {deck_id}",
            deck.id
        )));
    }
    let draft = validate_deck_draft(DeckDraft::from(&deck))?;
    ctx.storage
        .update_deck(deck_id, &draft)
        .await
        .map_err(internal)?
        .ok_or_else(|| deck_not_found(deck_id))
}

pub async fn delete_deck(ctx: &ApiContext, deck_id: DeckId) -> Result<(), ApiError> {
    let deleted = ctx.storage.delete_deck(deck_id).await.map_err(internal)?;
    if !deleted {
        return Err(deck_not_found(deck_id));
    }
    info!(deck_id = deck_id.0, "deleted deck");
    Ok(())
}

pub async fn create_card(
    ctx: &ApiContext,
    deck_id: DeckId,
    draft: CardDraft,
) -> Result<Card, ApiError> {
    let draft = validate_card_draft(draft)?;
    let card = ctx
        .storage
        .create_card(deck_id, &draft)
        .await
        .map_err(internal)?
        .ok_or_else(|| deck_not_found(deck_id))?;
    info!(deck_id = deck_id.0, card_id = card.id.0, "created card");
    Ok(card)
}

pub async fn read_card(ctx: &ApiContext, card_id: CardId) -> Result<Card, ApiError> {
    ctx.storage
        .read_card(card_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| card_not_found(card_id))
}

/// Edits a card's faces. Moving a card to another deck is rejected.
pub async fn update_card(
    ctx: &ApiContext,
    card_id: CardId,
    card: Card,
) -> Result<Card, ApiError> {
    if card.id != card_id {
        return Err(ApiError::validation(format!(
            "card id {} does not match path id {card_id}",
            card.id
        )));
    }
    let existing = read_card(ctx, card_id).await?;
    if existing.deck_id != card.deck_id {
        return Err(ApiError::validation("cards cannot move between decks"));
    }

    let draft = validate_card_draft(CardDraft::from(&card))?;
    ctx.storage
        .update_card(card_id, &draft)
        .await
        .map_err(internal)?
        .ok_or_else(|| card_not_found(card_id))
}

pub async fn delete_card(ctx: &ApiContext, card_id: CardId) -> Result<(), ApiError> {
    let deleted = ctx.storage.delete_card(card_id).await.map_err(internal)?;
    if !deleted {
        return Err(card_not_found(card_id));
    }
    info!(card_id = card_id.0, "deleted card");
    Ok(())
}

fn validate_deck_draft(draft: DeckDraft) -> Result<DeckDraft, ApiError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("deck name must not be empty"));
    }
    if name.chars().count() > MAX_DECK_NAME_CHARS {
        return Err(ApiError::validation(format!(
            "deck name exceeds {MAX_DECK_NAME_CHARS} characters"
        )));
    }
    Ok(DeckDraft {
        name: name.to_string(),
        description: draft.description.trim().to_string(),
    })
}

fn validate_card_draft(draft: CardDraft) -> Result<CardDraft, ApiError> {
    let front = draft.front.trim();
    let back = draft.back.trim();
    if front.is_empty() || back.is_empty() {
        return Err(ApiError::validation("card front and back must not be empty"));
    }
    Ok(CardDraft {
        front: front.to_string(),
        back: back.to_string(),
    })
}

fn deck_not_found(deck_id: DeckId) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("deck {deck_id} not found"))
}

fn card_not_found(card_id: CardId) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("card {card_id} not found"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

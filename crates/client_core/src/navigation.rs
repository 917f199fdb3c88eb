//! Capabilities the core consumes from its host: navigation and yes/no confirmation.

use std::fmt;

use async_trait::async_trait;
use shared::domain::{CardId, DeckId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    NewDeck,
    Deck(DeckId),
    EditDeck(DeckId),
    Study(DeckId),
    AddCard(DeckId),
    EditCard { deck_id: DeckId, card_id: CardId },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::NewDeck => "/decks/new".to_string(),
            Route::Deck(deck_id) => format!("/decks/{deck_id}"),
            Route::EditDeck(deck_id) => format!("/decks/{deck_id}/edit"),
            Route::Study(deck_id) => format!("/decks/{deck_id}/study"),
            Route::AddCard(deck_id) => format!("/decks/{deck_id}/cards/new"),
            Route::EditCard { deck_id, card_id } => {
                format!("/decks/{deck_id}/cards/{card_id}/edit")
            }
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path
            .trim_end_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        let id = |raw: &str| raw.parse::<i64>().ok();

        match segments.as_slice() {
            [] => Some(Route::Home),
            ["decks", "new"] => Some(Route::NewDeck),
            ["decks", deck] => id(deck).map(|d| Route::Deck(DeckId(d))),
            ["decks", deck, "edit"] => id(deck).map(|d| Route::EditDeck(DeckId(d))),
            ["decks", deck, "study"] => id(deck).map(|d| Route::Study(DeckId(d))),
            ["decks", deck, "cards", "new"] => id(deck).map(|d| Route::AddCard(DeckId(d))),
            ["decks", deck, "cards", card, "edit"] => Some(Route::EditCard {
                deck_id: DeckId(id(deck)?),
                card_id: CardId(id(card)?),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Moves the user to another screen. The core never reads navigation state back.
pub trait Navigator: Send + Sync {
    fn push(&self, route: Route);
}

/// A yes/no decision point awaited before destructive or session-ending steps.
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

pub const DELETE_DECK_PROMPT: &str = "Delete this deck?\n\nYou will not be able to recover it.";
pub const DELETE_CARD_PROMPT: &str = "Delete this card?\n\nYou will not be able to recover it.";
pub const RESTART_PROMPT: &str = "Restart cards?\n\nClick 'cancel' to return to the home page.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_parse_back_to_routes() {
        let routes = [
            Route::Home,
            Route::NewDeck,
            Route::Deck(DeckId(3)),
            Route::EditDeck(DeckId(3)),
            Route::Study(DeckId(3)),
            Route::AddCard(DeckId(3)),
            Route::EditCard {
                deck_id: DeckId(3),
                card_id: CardId(12),
            },
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
    }

    #[test]
    fn rejects_placeholder_segments() {
        assert_eq!(Route::parse("/decks/:deckId/cards/new"), None);
        assert_eq!(Route::parse("/cards/1"), None);
    }
}

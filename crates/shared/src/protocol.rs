use serde::{Deserialize, Serialize};

use crate::domain::{Card, Deck};

/// Payload for creating or replacing a deck's own fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<&Deck> for DeckDraft {
    fn from(deck: &Deck) -> Self {
        Self {
            name: deck.name.clone(),
            description: deck.description.clone(),
        }
    }
}

/// Payload for creating or replacing a card's faces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
}

impl From<&Card> for CardDraft {
    fn from(card: &Card) -> Self {
        Self {
            front: card.front.clone(),
            back: card.back.clone(),
        }
    }
}

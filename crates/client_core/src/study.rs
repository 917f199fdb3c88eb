//! The study-session state machine.
//!
//! A session walks a deck's cards in order. Each card is shown front first; `flip` toggles the
//! face and `advance` is accepted only on the back. Advancing past the back of the last card
//! completes the session, at which point the user either restarts from the first card or leaves
//! for the deck list.

use std::sync::Arc;

use shared::domain::{Card, Deck, DeckId};
use tracing::{debug, info};

use crate::{
    error::StudyError,
    navigation::{ConfirmPrompt, Navigator, Route, RESTART_PROMPT},
};

/// Decks with fewer cards than this cannot be studied.
pub const MIN_STUDY_CARDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

impl Face {
    pub fn flipped(self) -> Self {
        match self {
            Face::Front => Face::Back,
            Face::Back => Face::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyState {
    NotEnoughCards { card_count: usize },
    Showing { index: usize, face: Face },
    SessionComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StudyControls {
    pub flip: bool,
    pub next: bool,
    pub add_cards: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudyView<'a> {
    NotEnoughCards { message: String },
    Card { progress: String, text: &'a str, face: Face },
    Complete,
}

pub fn not_enough_cards_message(card_count: usize) -> String {
    let count = if card_count == 1 {
        "There is 1 card in this deck.".to_string()
    } else {
        format!("There are {card_count} cards in this deck.")
    };
    format!("Not enough cards.\nYou need at least {MIN_STUDY_CARDS} cards to study. {count}")
}

/// Pure session state over an immutable snapshot of a deck's cards.
#[derive(Debug, Clone)]
pub struct StudySession {
    deck_id: DeckId,
    deck_name: String,
    cards: Arc<[Card]>,
    state: StudyState,
}

impl StudySession {
    pub fn new(deck: &Deck) -> Self {
        let cards: Arc<[Card]> = deck.cards.clone().into();
        let state = if cards.len() < MIN_STUDY_CARDS {
            StudyState::NotEnoughCards {
                card_count: cards.len(),
            }
        } else {
            StudyState::Showing {
                index: 0,
                face: Face::Front,
            }
        };
        Self {
            deck_id: deck.id,
            deck_name: deck.name.clone(),
            cards,
            state,
        }
    }

    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    pub fn state(&self) -> StudyState {
        self.state
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn current_card(&self) -> Option<&Card> {
        match self.state {
            StudyState::Showing { index, .. } => self.cards.get(index),
            _ => None,
        }
    }

    /// Toggles the visible face. No-op outside `Showing`.
    pub fn flip(&mut self) -> StudyState {
        if let StudyState::Showing { index, face } = self.state {
            self.state = StudyState::Showing {
                index,
                face: face.flipped(),
            };
        } else {
            debug!(deck_id = self.deck_id.0, state = ?self.state, "ignored flip");
        }
        self.state
    }

    /// Moves past the back of the current card. Rejected, with state unchanged, unless the
    /// back face is showing.
    pub fn advance(&mut self) -> Result<StudyState, StudyError> {
        match self.state {
            StudyState::Showing {
                face: Face::Front, ..
            } => Err(StudyError::AdvanceBeforeFlip),
            StudyState::Showing {
                index,
                face: Face::Back,
            } => {
                self.state = if index + 1 < self.cards.len() {
                    StudyState::Showing {
                        index: index + 1,
                        face: Face::Front,
                    }
                } else {
                    StudyState::SessionComplete
                };
                Ok(self.state)
            }
            StudyState::SessionComplete => Err(StudyError::SessionComplete),
            StudyState::NotEnoughCards { card_count } => Err(StudyError::NotEnoughCards {
                card_count,
                minimum: MIN_STUDY_CARDS,
            }),
        }
    }

    pub fn restart(&mut self) -> Result<StudyState, StudyError> {
        if self.state != StudyState::SessionComplete {
            return Err(StudyError::NotComplete);
        }
        self.state = StudyState::Showing {
            index: 0,
            face: Face::Front,
        };
        Ok(self.state)
    }

    pub fn heading(&self) -> String {
        format!("{}: Study", self.deck_name)
    }

    pub fn controls(&self) -> StudyControls {
        match self.state {
            StudyState::NotEnoughCards { .. } => StudyControls {
                add_cards: true,
                ..StudyControls::default()
            },
            StudyState::Showing { face, .. } => StudyControls {
                flip: true,
                next: face == Face::Back,
                add_cards: false,
            },
            StudyState::SessionComplete => StudyControls::default(),
        }
    }

    pub fn view(&self) -> StudyView<'_> {
        match self.state {
            StudyState::NotEnoughCards { card_count } => StudyView::NotEnoughCards {
                message: not_enough_cards_message(card_count),
            },
            StudyState::Showing { index, face } => {
                let card = &self.cards[index];
                StudyView::Card {
                    progress: format!("Card {} of {}", index + 1, self.cards.len()),
                    text: match face {
                        Face::Front => card.front.as_str(),
                        Face::Back => card.back.as_str(),
                    },
                    face,
                }
            }
            StudyState::SessionComplete => StudyView::Complete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyStep {
    Continue(StudyState),
    Restarted,
    Exited,
}

/// Drives a [`StudySession`] against the host's confirmation and navigation capabilities.
/// Owns the session state for its lifetime; exiting discards it.
pub struct StudySessionController {
    deck_id: DeckId,
    session: Option<StudySession>,
    navigator: Arc<dyn Navigator>,
    confirm: Arc<dyn ConfirmPrompt>,
}

impl StudySessionController {
    pub fn new(deck: &Deck, navigator: Arc<dyn Navigator>, confirm: Arc<dyn ConfirmPrompt>) -> Self {
        let session = StudySession::new(deck);
        info!(
            deck_id = deck.id.0,
            card_count = session.card_count(),
            state = ?session.state(),
            "study session started"
        );
        Self {
            deck_id: deck.id,
            session: Some(session),
            navigator,
            confirm,
        }
    }

    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    /// `None` once the session has been exited.
    pub fn session(&self) -> Option<&StudySession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> Option<StudyState> {
        self.session.as_ref().map(StudySession::state)
    }

    pub fn flip(&mut self) -> Result<StudyState, StudyError> {
        let session = self.session.as_mut().ok_or(StudyError::SessionEnded)?;
        Ok(session.flip())
    }

    /// Advances; on completion awaits the restart prompt and either restarts or leaves for the
    /// deck list, discarding the session. Advancing a completed session whose prompt was never
    /// answered asks again.
    pub async fn advance(&mut self) -> Result<StudyStep, StudyError> {
        if self.state() == Some(StudyState::SessionComplete) {
            return self.resolve_completion().await;
        }
        let session = self.session.as_mut().ok_or(StudyError::SessionEnded)?;
        match session.advance()? {
            StudyState::SessionComplete => self.resolve_completion().await,
            state => Ok(StudyStep::Continue(state)),
        }
    }

    async fn resolve_completion(&mut self) -> Result<StudyStep, StudyError> {
        if self.confirm.confirm(RESTART_PROMPT).await {
            let session = self.session.as_mut().ok_or(StudyError::SessionEnded)?;
            session.restart()?;
            info!(deck_id = self.deck_id.0, "study session restarted");
            Ok(StudyStep::Restarted)
        } else {
            self.session = None;
            info!(deck_id = self.deck_id.0, "study session finished");
            self.navigator.push(Route::Home);
            Ok(StudyStep::Exited)
        }
    }

    /// The only affordance offered when the deck is too small: go add cards to it.
    pub fn add_cards(&self) -> Result<(), StudyError> {
        match self.state() {
            Some(StudyState::NotEnoughCards { .. }) => {
                self.navigator.push(Route::AddCard(self.deck_id));
                Ok(())
            }
            Some(_) => Err(StudyError::NotComplete),
            None => Err(StudyError::SessionEnded),
        }
    }

    /// Leaves mid-session for the deck screen, discarding the session.
    pub fn exit(&mut self) {
        if self.session.take().is_some() {
            info!(deck_id = self.deck_id.0, "study session abandoned");
            self.navigator.push(Route::Deck(self.deck_id));
        }
    }
}

#[cfg(test)]
#[path = "tests/study_tests.rs"]
mod tests;

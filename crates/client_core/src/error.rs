//! Failure taxonomy for the client core.

use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The read's lifecycle ended before it resolved. Expected; never shown to the user.
    #[error("read cancelled")]
    Cancelled,
    #[error("{operation} failed: {source}")]
    TransientReadFailure {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("{operation} failed: {source}")]
    MutationFailure {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ClientError {
    pub fn read(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::TransientReadFailure {
            operation,
            source: source.into(),
        }
    }

    pub fn mutation(operation: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::MutationFailure {
            operation,
            source: source.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The service's structured error, when the failure came back from the server.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::TransientReadFailure { source, .. } | Self::MutationFailure { source, .. } => {
                source.downcast_ref::<ApiError>()
            }
            Self::Cancelled => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StudyError {
    #[error("advance is only accepted after the card has been flipped")]
    AdvanceBeforeFlip,
    #[error("the session is complete; restart or exit")]
    SessionComplete,
    #[error("the deck has {card_count} cards; at least {minimum} are needed to study")]
    NotEnoughCards { card_count: usize, minimum: usize },
    #[error("restart is only available once the session is complete")]
    NotComplete,
    #[error("the study session has ended")]
    SessionEnded,
    #[error("no deck is loaded")]
    NoDeckLoaded,
}

//! Client-side core of the flashcards app: guarded reads, cross-view invalidation, the study
//! session state machine and the screen orchestrators that tie them to a [`DeckApi`].

pub mod api;
pub mod cancel;
pub mod error;
pub mod fetch_guard;
pub mod http;
pub mod invalidation;
pub mod mutations;
pub mod navigation;
pub mod orchestrator;
pub mod study;

pub use api::DeckApi;
pub use cancel::{CancellationToken, FetchLifecycle};
pub use error::{ClientError, StudyError};
pub use fetch_guard::{DataFetchGuard, FetchOutcome};
pub use http::HttpDeckApi;
pub use invalidation::{Interest, Invalidation, InvalidationBus, InvalidationSubscription};
pub use mutations::{DeckMutations, DeleteOutcome};
pub use navigation::{ConfirmPrompt, Navigator, Route};
pub use orchestrator::{
    CardView, DeckListOrchestrator, DeckViewOrchestrator, Loadable, SyncedView, ViewSource,
};
pub use study::{
    Face, StudySession, StudySessionController, StudyState, StudyStep, MIN_STUDY_CARDS,
};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

use super::*;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::oneshot;

#[tokio::test]
async fn applies_result_of_authoritative_read() {
    let guard = DataFetchGuard::new();
    let mut applied = None;
    let outcome = guard
        .guarded_read("deck-1", |_token| async { Ok(41) }, |value| {
            applied = Some(value)
        })
        .await
        .expect("read");
    assert_eq!(outcome, FetchOutcome::Applied);
    assert_eq!(applied, Some(41));
}

#[tokio::test]
async fn late_result_for_old_key_does_not_overwrite_new_key() {
    let guard = Arc::new(DataFetchGuard::<u32>::new());
    let state = Arc::new(Mutex::new(None::<&'static str>));

    let (started_tx, started_rx) = oneshot::channel::<()>();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let slow = {
        let guard = Arc::clone(&guard);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            guard
                .guarded_read(
                    1,
                    |_token| async move {
                        // Ignores its token on purpose: only the arrival check protects state.
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok("deck for key 1")
                    },
                    |value| *state.lock() = Some(value),
                )
                .await
        })
    };

    started_rx.await.expect("slow read started");

    let outcome = guard
        .guarded_read(2, |_token| async { Ok("deck for key 2") }, |value| {
            *state.lock() = Some(value)
        })
        .await
        .expect("fast read");
    assert_eq!(outcome, FetchOutcome::Applied);

    release_tx.send(()).expect("release slow read");
    let slow_outcome = slow.await.expect("join").expect("slow read");

    assert_eq!(slow_outcome, FetchOutcome::Cancelled);
    assert_eq!(*state.lock(), Some("deck for key 2"));
}

#[tokio::test]
async fn new_key_fires_token_of_outstanding_read() {
    let guard = DataFetchGuard::new();
    let first = guard.begin("a");
    assert!(!first.token.is_cancelled());

    let second = guard.begin("b");
    assert!(first.token.is_cancelled());
    assert!(!guard.is_current(&first));
    assert!(guard.is_current(&second));
    assert_eq!(guard.current_key(), Some("b"));
}

#[tokio::test]
async fn cancellation_observed_by_read_is_not_an_error() {
    let guard = DataFetchGuard::<&str>::new();
    let mut applied = false;
    let outcome = guard
        .guarded_read(
            "deck",
            |_token| async { Err::<(), _>(ClientError::Cancelled) },
            |_| applied = true,
        )
        .await
        .expect("cancelled is not an error");
    assert_eq!(outcome, FetchOutcome::Cancelled);
    assert!(!applied);
}

#[tokio::test]
async fn authoritative_failure_propagates() {
    let guard = DataFetchGuard::<&str>::new();
    let err = guard
        .guarded_read(
            "deck",
            |_token| async { Err::<(), _>(ClientError::read("read_deck", anyhow!("boom"))) },
            |_| {},
        )
        .await
        .expect_err("failure surfaces");
    assert!(matches!(
        err,
        ClientError::TransientReadFailure {
            operation: "read_deck",
            ..
        }
    ));
}

#[tokio::test]
async fn teardown_discards_result_that_arrives_afterwards() {
    let guard = Arc::new(DataFetchGuard::<&'static str>::new());
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let (started_tx, started_rx) = oneshot::channel::<()>();

    let pending = {
        let guard = Arc::clone(&guard);
        tokio::spawn(async move {
            let mut applied = false;
            let outcome = guard
                .guarded_read(
                    "deck",
                    |token| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        assert!(token.is_cancelled());
                        Ok(())
                    },
                    |_| applied = true,
                )
                .await;
            (outcome, applied)
        })
    };

    started_rx.await.expect("started");
    guard.teardown();
    release_tx.send(()).expect("release");

    let (outcome, applied) = pending.await.expect("join");
    assert_eq!(outcome.expect("no error"), FetchOutcome::Cancelled);
    assert!(!applied);
    assert_eq!(guard.current_key(), None);
}

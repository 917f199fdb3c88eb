//! Guarded reads: one authoritative in-flight read per view, stale results discarded.

use std::{fmt::Debug, future::Future};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    cancel::{CancellationToken, FetchLifecycle},
    error::ClientError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The read resolved while still authoritative and its result was applied.
    Applied,
    /// The read was cancelled or superseded; nothing was applied.
    Cancelled,
}

/// Identifies one issued read. Handed back to the guard at the write-back boundary.
#[derive(Debug, Clone)]
pub struct FetchTicket<K> {
    pub key: K,
    pub generation: u64,
    pub token: CancellationToken,
}

struct ActiveFetch<K> {
    key: K,
    lifecycle: FetchLifecycle,
}

struct GuardScope<K> {
    active: Option<ActiveFetch<K>>,
    next_generation: u64,
}

pub struct DataFetchGuard<K> {
    scope: Mutex<GuardScope<K>>,
}

impl<K> Default for DataFetchGuard<K> {
    fn default() -> Self {
        Self {
            scope: Mutex::new(GuardScope {
                active: None,
                next_generation: 1,
            }),
        }
    }
}

impl<K: Clone + PartialEq + Debug> DataFetchGuard<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new lifecycle for `key`, cancelling whatever read was outstanding.
    pub fn begin(&self, key: K) -> FetchTicket<K> {
        let mut scope = self.scope.lock();
        let generation = scope.next_generation;
        scope.next_generation += 1;

        let lifecycle = FetchLifecycle::new(generation);
        let token = lifecycle.token();
        if let Some(previous) = scope.active.replace(ActiveFetch {
            key: key.clone(),
            lifecycle,
        }) {
            if previous.lifecycle.cancel() {
                debug!(
                    previous_key = ?previous.key,
                    next_key = ?key,
                    "cancelled outstanding read"
                );
            }
        }

        FetchTicket {
            key,
            generation,
            token,
        }
    }

    /// Cancels the outstanding read, if any, and forgets the scope. Used on unmount.
    pub fn teardown(&self) {
        if let Some(active) = self.scope.lock().active.take() {
            active.lifecycle.cancel();
            debug!(key = ?active.key, "fetch scope torn down");
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket<K>) -> bool {
        self.scope.lock().active.as_ref().is_some_and(|active| {
            active.lifecycle.generation() == ticket.generation && !active.lifecycle.is_cancelled()
        })
    }

    pub fn current_key(&self) -> Option<K> {
        self.scope
            .lock()
            .active
            .as_ref()
            .map(|active| active.key.clone())
    }

    /// Applies `value` only if `ticket` is still the authoritative, uncancelled read.
    /// The check and `apply` run under the scope lock so no newer read can begin in between.
    pub fn commit<T>(&self, ticket: &FetchTicket<K>, value: T, apply: impl FnOnce(T)) -> bool {
        let scope = self.scope.lock();
        let current = scope.active.as_ref().is_some_and(|active| {
            active.lifecycle.generation() == ticket.generation && !active.lifecycle.is_cancelled()
        });
        if current {
            apply(value);
        } else {
            debug!(key = ?ticket.key, generation = ticket.generation, "discarded stale read");
        }
        current
    }

    /// Issues `read` under a fresh lifecycle for `key` and hands its result to `apply`
    /// unless the lifecycle was cancelled or superseded before the result arrived.
    ///
    /// Cancellation is reported as [`FetchOutcome::Cancelled`], never as an error. A failure
    /// of the authoritative read is returned; a failure of a superseded read is dropped.
    pub async fn guarded_read<T, F, Fut, A>(
        &self,
        key: K,
        read: F,
        apply: A,
    ) -> Result<FetchOutcome, ClientError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        A: FnOnce(T),
    {
        let ticket = self.begin(key);
        self.read_with(ticket, read, apply).await
    }

    /// Runs `read` under a lifecycle already opened with [`DataFetchGuard::begin`]. Same
    /// outcome rules as [`DataFetchGuard::guarded_read`].
    pub async fn read_with<T, F, Fut, A>(
        &self,
        ticket: FetchTicket<K>,
        read: F,
        apply: A,
    ) -> Result<FetchOutcome, ClientError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        A: FnOnce(T),
    {
        let result = read(ticket.token.clone()).await;

        match result {
            Ok(value) => {
                if self.commit(&ticket, value, apply) {
                    Ok(FetchOutcome::Applied)
                } else {
                    Ok(FetchOutcome::Cancelled)
                }
            }
            Err(ClientError::Cancelled) => {
                debug!(key = ?ticket.key, "read observed cancellation");
                Ok(FetchOutcome::Cancelled)
            }
            Err(err) if self.is_current(&ticket) => {
                warn!(key = ?ticket.key, error = %err, "guarded read failed");
                Err(err)
            }
            Err(err) => {
                debug!(key = ?ticket.key, error = %err, "dropped failure of superseded read");
                Ok(FetchOutcome::Cancelled)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/fetch_guard_tests.rs"]
mod tests;

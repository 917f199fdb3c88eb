//! Scope-owned cancellation.
//!
//! A [`FetchLifecycle`] is created per mount (or key change) of a view and hands out
//! [`CancellationToken`]s to the reads it issues. Cancelling the lifecycle, or dropping it,
//! fires every token exactly once.

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancellationToken {
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the owning lifecycle is cancelled or dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[derive(Debug)]
pub struct FetchLifecycle {
    generation: u64,
    tx: watch::Sender<bool>,
}

impl FetchLifecycle {
    pub fn new(generation: u64) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Fires the token. Returns `true` only for the call that actually fired it.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }
}

impl Drop for FetchLifecycle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable FIFO queue on top of a [`Store`].
//!
//! Items live under `["q", seq]` until acknowledged, so anything pushed and
//! not yet acked is redelivered after a restart. A single listener receives
//! one item at a time; the next item is only delivered once the current one
//! is acked.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, Notify};
use tokio_util::sync::CancellationToken;

use crate::key::{Key, Segment};
use crate::store::{StorageError, Store};

const QUEUE_PREFIX: &str = "q";

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("queue already has an active listener")]
    AlreadyListening,
    #[error("failed to acknowledge queue entry: {0}")]
    AckFailed(String),
}

fn prefix() -> Key {
    Key::new().push(QUEUE_PREFIX)
}

fn entry_key(seq: u64) -> Key {
    prefix().push(seq)
}

pub struct Queue {
    store: Arc<Store>,
    next_seq: Mutex<u64>,
    notify: Notify,
    listening: AtomicBool,
}

impl Queue {
    /// Open the queue stored in `store`, continuing its sequence numbering.
    pub fn open(store: Arc<Store>) -> Result<Self, QueueError> {
        let next_seq = match store.last_with_prefix::<serde_json::Value>(&prefix())? {
            Some((key, _)) => match key.last() {
                Some(Segment::U64(n)) => n + 1,
                _ => 1,
            },
            None => 1,
        };
        let pending = store.count_prefix(&prefix());
        tracing::debug!(dir = %store.dir().display(), pending, next_seq, "queue opened");

        Ok(Self { store, next_seq: Mutex::new(next_seq), notify: Notify::new(), listening: AtomicBool::new(false) })
    }

    /// Durably append an item. Returns its sequence number.
    pub fn push<T: Serialize>(&self, item: &T) -> Result<u64, QueueError> {
        let seq = {
            let mut next = self.next_seq.lock();
            let seq = *next;
            self.store.set(&entry_key(seq), item)?;
            *next += 1;
            seq
        };
        self.notify.notify_one();
        Ok(seq)
    }

    /// Entries pushed and not yet acknowledged.
    pub fn len(&self) -> usize {
        self.store.count_prefix(&prefix())
    }

    pub fn is_empty(&self) -> bool {
        !self.store.has_prefix(&prefix())
    }

    /// Deliver entries in order to `handler` until `cancel` fires.
    ///
    /// The handler receives each item with an [`Ack`]. Delivery pauses until
    /// that `Ack` is acked; dropping it unacked stalls the queue until
    /// cancellation. A handler error is logged and the entry acked. Entries
    /// that no longer deserialize as `T` are logged and dropped.
    pub async fn listen<T, F, Fut, E>(&self, mut handler: F, cancel: CancellationToken) -> Result<(), QueueError>
    where
        T: DeserializeOwned,
        F: FnMut(T, Ack) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(QueueError::AlreadyListening);
        }
        let _listening = ListeningGuard(&self.listening);

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let Some((key, raw)) = self.store.first_with_prefix::<serde_json::Value>(&prefix())? else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    _ = self.notify.notified() => continue,
                }
            };

            let item = match serde_json::from_value::<T>(raw) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "dropping undecodable queue entry");
                    self.store.delete(&key)?;
                    continue;
                }
            };

            let (tx, rx) = oneshot::channel();
            let state = Arc::new(AckState {
                key: key.clone(),
                store: Arc::clone(&self.store),
                done: Mutex::new(Some(tx)),
            });

            match handler(item, Ack { state: Arc::clone(&state) }).await {
                // The handler may have acked before failing; that ack's result is already on `rx`
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "queue handler failed, acknowledging entry");
                    state.complete()?;
                }
                Ok(()) => {
                    if !state.is_acked() && Arc::strong_count(&state) == 1 {
                        tracing::warn!(key = %key, "queue entry dropped without ack, delivery stalled until cancelled");
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                res = rx => match res {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!(key = %key, error = %e, "queue ack failed, stopping delivery");
                        return Err(QueueError::AckFailed(e));
                    }
                    Err(_) => {
                        cancel.cancelled().await;
                        return Ok(());
                    }
                },
            }
        }
    }
}

struct ListeningGuard<'a>(&'a AtomicBool);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct AckState {
    key: Key,
    store: Arc<Store>,
    done: Mutex<Option<oneshot::Sender<Result<(), String>>>>,
}

impl AckState {
    fn complete(&self) -> Result<(), StorageError> {
        let Some(tx) = self.done.lock().take() else {
            return Ok(());
        };
        let result = self.store.delete(&self.key);
        let _ = tx.send(result.as_ref().map(|_| ()).map_err(|e| e.to_string()));
        result
    }

    fn is_acked(&self) -> bool {
        self.done.lock().is_none()
    }
}

/// Acknowledgement handle for one delivered entry.
pub struct Ack {
    state: Arc<AckState>,
}

impl Ack {
    /// Remove the entry from the queue and release the next one.
    pub fn ack(self) -> Result<(), StorageError> {
        self.state.complete()
    }

    pub fn key(&self) -> &Key {
        &self.state.key
    }
}

impl std::fmt::Debug for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ack").field("key", &self.state.key).finish()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

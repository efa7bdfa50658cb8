// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

fn open(dir: &TempDir) -> Arc<Queue> {
    let store = Arc::new(Store::open(dir.path()).unwrap());
    Arc::new(Queue::open(store).unwrap())
}

/// Run a listener that forwards every item and acks it.
fn spawn_acking(queue: &Arc<Queue>, cancel: &CancellationToken) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = Arc::clone(queue);
    let cancel = cancel.clone();
    tokio::spawn(async move {
        queue
            .listen(
                move |item: String, ack: Ack| {
                    let tx = tx.clone();
                    async move {
                        ack.ack()?;
                        let _ = tx.send(item);
                        Ok::<(), StorageError>(())
                    }
                },
                cancel,
            )
            .await
    });
    rx
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.ok().flatten()
}

#[tokio::test]
async fn delivers_in_push_order() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    for item in ["a", "b", "c"] {
        queue.push(&item).unwrap();
    }

    let cancel = CancellationToken::new();
    let mut rx = spawn_acking(&queue, &cancel);

    assert_eq!(recv(&mut rx).await.as_deref(), Some("a"));
    assert_eq!(recv(&mut rx).await.as_deref(), Some("b"));
    assert_eq!(recv(&mut rx).await.as_deref(), Some("c"));

    queue.push(&"d").unwrap();
    assert_eq!(recv(&mut rx).await.as_deref(), Some("d"));
    cancel.cancel();
}

#[tokio::test]
async fn push_assigns_increasing_seq_across_reopen() {
    let dir = tempdir().unwrap();
    {
        let queue = open(&dir);
        assert_eq!(queue.push(&"a").unwrap(), 1);
        assert_eq!(queue.push(&"b").unwrap(), 2);
    }
    let queue = open(&dir);
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.push(&"c").unwrap(), 3);
}

#[tokio::test]
async fn unacked_entries_survive_restart() {
    let dir = tempdir().unwrap();
    {
        let queue = open(&dir);
        queue.push(&"pending").unwrap();
    }

    let queue = open(&dir);
    let cancel = CancellationToken::new();
    let mut rx = spawn_acking(&queue, &cancel);
    assert_eq!(recv(&mut rx).await.as_deref(), Some("pending"));
    cancel.cancel();
}

#[tokio::test]
async fn ack_removes_entry() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    queue.push(&"a").unwrap();

    let cancel = CancellationToken::new();
    let mut rx = spawn_acking(&queue, &cancel);
    assert_eq!(recv(&mut rx).await.as_deref(), Some("a"));
    assert!(queue.is_empty());
    cancel.cancel();
}

#[tokio::test]
async fn dropped_ack_stalls_until_cancelled() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    queue.push(&"first").unwrap();
    queue.push(&"second").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let listener = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            queue
                .listen(
                    move |item: String, _ack: Ack| {
                        let _ = tx.send(item);
                        async { Ok::<(), StorageError>(()) }
                    },
                    cancel,
                )
                .await
        })
    };

    assert_eq!(recv(&mut rx).await.as_deref(), Some("first"));
    let next = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(next.is_err(), "second entry delivered before first was acked");
    assert_eq!(queue.len(), 2);

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), listener).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn handler_error_still_acks() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    queue.push(&"boom").unwrap();
    queue.push(&"ok").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            queue
                .listen(
                    move |item: String, ack: Ack| {
                        let _ = tx.send(item.clone());
                        async move {
                            if item == "boom" {
                                return Err("handler failed");
                            }
                            ack.ack().map_err(|_| "ack failed")
                        }
                    },
                    cancel,
                )
                .await
        });
    }

    assert_eq!(recv(&mut rx).await.as_deref(), Some("boom"));
    assert_eq!(recv(&mut rx).await.as_deref(), Some("ok"));
    cancel.cancel();
}

#[tokio::test]
async fn undecodable_entry_is_dropped() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    queue.push(&42).unwrap();
    queue.push(&"text").unwrap();

    let cancel = CancellationToken::new();
    let mut rx = spawn_acking(&queue, &cancel);
    assert_eq!(recv(&mut rx).await.as_deref(), Some("text"));
    assert!(queue.is_empty());
    cancel.cancel();
}

#[tokio::test]
async fn second_listener_is_rejected() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    let cancel = CancellationToken::new();
    let _rx = spawn_acking(&queue, &cancel);

    // Let the first listener claim the queue
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = queue
        .listen(|_: String, ack: Ack| async move { ack.ack() }, cancel.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::AlreadyListening));
    cancel.cancel();
}

#[tokio::test]
async fn listen_returns_when_cancelled() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    let cancel = CancellationToken::new();
    cancel.cancel();

    queue.listen(|_: String, ack: Ack| async move { ack.ack() }, cancel).await.unwrap();
}

#[tokio::test]
async fn failed_ack_inside_failing_handler_stops_delivery() {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let queue = Arc::new(Queue::open(Arc::clone(&store)).unwrap());
    queue.push(&"first").unwrap();
    queue.push(&"second").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let listener = {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            queue
                .listen(
                    move |item: String, ack: Ack| {
                        let _ = tx.send(item);
                        let store = Arc::clone(&store);
                        async move {
                            let read_only = std::fs::File::open(store.wal_path()).unwrap();
                            let writable = store.replace_wal_file(read_only);
                            let acked = ack.ack();
                            store.replace_wal_file(writable);
                            acked.map_err(|e| e.to_string())?;
                            Err::<(), String>("unreachable".to_string())
                        }
                    },
                    cancel,
                )
                .await
        })
    };

    let result = tokio::time::timeout(Duration::from_secs(5), listener).await.unwrap().unwrap();
    assert!(matches!(result, Err(QueueError::AckFailed(_))));

    assert_eq!(recv(&mut rx).await.as_deref(), Some("first"));
    assert_eq!(rx.recv().await, None);
    assert_eq!(queue.len(), 2);
    cancel.cancel();
}

#[tokio::test]
async fn ack_then_handler_error_moves_on() {
    let dir = tempdir().unwrap();
    let queue = open(&dir);
    queue.push(&"a").unwrap();
    queue.push(&"b").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    {
        let queue = Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            queue
                .listen(
                    move |item: String, ack: Ack| {
                        let tx = tx.clone();
                        async move {
                            ack.ack().map_err(|e| e.to_string())?;
                            let _ = tx.send(item);
                            Err::<(), String>("after ack".to_string())
                        }
                    },
                    cancel,
                )
                .await
        });
    }

    assert_eq!(recv(&mut rx).await.as_deref(), Some("a"));
    assert_eq!(recv(&mut rx).await.as_deref(), Some("b"));
    assert!(queue.is_empty());
    cancel.cancel();
}

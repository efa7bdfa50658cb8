// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for bilt: an ordered, durable key-value store and the
//! job queue built on top of it.
//!
//! Each store is a directory holding a write-ahead log and a compacted
//! snapshot. Recovery loads the snapshot and replays WAL entries after
//! the snapshot's sequence number.

mod key;
mod queue;
mod snapshot;
mod store;
mod wal;

pub use key::{Key, KeyError, Segment};
pub use queue::{Ack, Queue, QueueError};
pub use snapshot::{load_snapshot, set_aside, Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
pub use store::{StorageError, Store, StoreOptions};
pub use wal::{Wal, WalEntry, WalError, WalOp};

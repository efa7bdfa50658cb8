// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable ordered key-value store.
//!
//! State lives in memory as a `BTreeMap` over encoded keys. Every mutation
//! is appended to the WAL and fsynced before it is applied, so a returned
//! `set`/`delete` survives a crash. Once the WAL has grown past the
//! compaction threshold, the map is written out as a snapshot and the
//! covered WAL entries are dropped.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::key::{Key, KeyError};
use crate::snapshot::{load_snapshot, set_aside, Snapshot, SnapshotError};
use crate::wal::{self, Wal, WalError, WalOp};

const WAL_FILE: &str = "store.wal";
const SNAPSHOT_FILE: &str = "store.snapshot";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad key: {0}")]
    Key(#[from] KeyError),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// WAL records allowed past the last snapshot before compacting
    pub compact_threshold: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { compact_threshold: 1000 }
    }
}

struct StoreInner {
    map: BTreeMap<Vec<u8>, serde_json::Value>,
    wal: Wal,
}

pub struct Store {
    dir: PathBuf,
    options: StoreOptions,
    inner: Mutex<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("dir", &self.dir).finish_non_exhaustive()
    }
}

type Entries<T> = Vec<(Key, T)>;

impl Store {
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        Self::open_with(dir, StoreOptions::default())
    }

    /// Open (or create) the store in `dir`: load the snapshot, then replay
    /// the WAL entries written after it.
    pub fn open_with(dir: &Path, options: StoreOptions) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;

        let (mut map, snapshot_seq) = match load_or_set_aside(dir)? {
            Some(snapshot) => {
                let seq = snapshot.seq;
                (snapshot.decoded_entries().collect::<BTreeMap<_, _>>(), seq)
            }
            None => (BTreeMap::new(), 0),
        };

        let wal = Wal::open(&dir.join(WAL_FILE), snapshot_seq)?;
        let replay = wal.entries_after(snapshot_seq)?;
        let replayed = replay.len();
        for entry in replay {
            apply(&mut map, entry.op);
        }

        tracing::debug!(
            dir = %dir.display(),
            snapshot_seq,
            replayed,
            keys = map.len(),
            "store opened"
        );

        let store = Self { dir: dir.to_path_buf(), options, inner: Mutex::new(StoreInner { map, wal }) };
        store.maybe_compact(&mut store.inner.lock())?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a value. A missing key is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &Key) -> Result<Option<T>, StorageError> {
        let inner = self.inner.lock();
        match inner.map.get(&key.encode()) {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.inner.lock().map.contains_key(&key.encode())
    }

    /// Durably write a value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &Key, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        self.write(WalOp::Set { key: key.encode(), value })
    }

    /// Durably remove a key. Removing a missing key is a no-op.
    pub fn delete(&self, key: &Key) -> Result<(), StorageError> {
        let encoded = key.encode();
        if !self.inner.lock().map.contains_key(&encoded) {
            return Ok(());
        }
        self.write(WalOp::Delete { key: encoded })
    }

    /// Entries with `from <= key < to`, in key order.
    pub fn range<T: DeserializeOwned>(&self, from: &Key, to: &Key) -> Result<Entries<T>, StorageError> {
        self.range_bytes(from.encode(), to.encode(), usize::MAX, false)
    }

    /// Every entry whose key extends `prefix`, in key order.
    pub fn scan_prefix<T: DeserializeOwned>(&self, prefix: &Key) -> Result<Entries<T>, StorageError> {
        let (from, to) = prefix.prefix_range();
        self.range_bytes(from, to, usize::MAX, false)
    }

    pub fn first_in_range<T: DeserializeOwned>(
        &self,
        from: &Key,
        to: &Key,
    ) -> Result<Option<(Key, T)>, StorageError> {
        Ok(self.range_bytes(from.encode(), to.encode(), 1, false)?.pop())
    }

    pub fn last_in_range<T: DeserializeOwned>(
        &self,
        from: &Key,
        to: &Key,
    ) -> Result<Option<(Key, T)>, StorageError> {
        Ok(self.range_bytes(from.encode(), to.encode(), 1, true)?.pop())
    }

    pub fn first_with_prefix<T: DeserializeOwned>(
        &self,
        prefix: &Key,
    ) -> Result<Option<(Key, T)>, StorageError> {
        let (from, to) = prefix.prefix_range();
        Ok(self.range_bytes(from, to, 1, false)?.pop())
    }

    pub fn last_with_prefix<T: DeserializeOwned>(
        &self,
        prefix: &Key,
    ) -> Result<Option<(Key, T)>, StorageError> {
        let (from, to) = prefix.prefix_range();
        Ok(self.range_bytes(from, to, 1, true)?.pop())
    }

    pub fn count_prefix(&self, prefix: &Key) -> usize {
        let (from, to) = prefix.prefix_range();
        self.inner.lock().map.range(from..to).count()
    }

    pub fn has_prefix(&self, prefix: &Key) -> bool {
        let (from, to) = prefix.prefix_range();
        self.inner.lock().map.range(from..to).next().is_some()
    }

    /// Snapshot the current state and drop the WAL entries it covers.
    pub fn compact(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        self.compact_locked(&mut inner)
    }

    fn range_bytes<T: DeserializeOwned>(
        &self,
        from: Vec<u8>,
        to: Vec<u8>,
        limit: usize,
        reverse: bool,
    ) -> Result<Entries<T>, StorageError> {
        // BTreeMap::range panics on an inverted range
        if from >= to {
            return Ok(Vec::new());
        }
        let inner = self.inner.lock();
        let range = inner.map.range(from..to);
        let decode = |(k, v): (&Vec<u8>, &serde_json::Value)| -> Result<(Key, T), StorageError> {
            Ok((Key::decode(k)?, T::deserialize(v)?))
        };
        if reverse {
            range.rev().take(limit).map(decode).collect()
        } else {
            range.take(limit).map(decode).collect()
        }
    }

    fn write(&self, op: WalOp) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner.wal.append(&op)?;
        inner.wal.flush()?;
        apply(&mut inner.map, op);
        self.maybe_compact(&mut inner)
    }

    fn maybe_compact(&self, inner: &mut StoreInner) -> Result<(), StorageError> {
        let pending = inner.wal.write_seq() - inner.wal.processed_seq();
        if pending > self.options.compact_threshold {
            self.compact_locked(inner)?;
        }
        Ok(())
    }

    fn compact_locked(&self, inner: &mut StoreInner) -> Result<(), StorageError> {
        let seq = inner.wal.write_seq();
        Snapshot::new(seq, &inner.map).save(&self.dir.join(SNAPSHOT_FILE))?;
        inner.wal.mark_processed(seq);
        inner.wal.truncate_before(seq + 1)?;
        tracing::debug!(dir = %self.dir.display(), seq, keys = inner.map.len(), "store compacted");
        Ok(())
    }
}

/// Load the snapshot in `dir`.
///
/// An unreadable snapshot is only dropped when the WAL still starts at
/// seq 1; after a compaction the snapshot holds writes the WAL no longer
/// has, and opening without it would silently lose them.
fn load_or_set_aside(dir: &Path) -> Result<Option<Snapshot>, StorageError> {
    let path = dir.join(SNAPSHOT_FILE);
    match load_snapshot(&path) {
        Ok(snapshot) => Ok(snapshot),
        Err(SnapshotError::Corrupt(reason)) => {
            if wal::first_seq(&dir.join(WAL_FILE))? != Some(1) {
                tracing::error!(path = %path.display(), %reason, "unreadable snapshot not covered by the WAL");
                return Err(SnapshotError::Corrupt(reason).into());
            }
            let bak = set_aside(&path)?;
            tracing::warn!(
                path = %path.display(),
                backup = %bak.display(),
                %reason,
                "unreadable snapshot, rebuilding from WAL"
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn apply(map: &mut BTreeMap<Vec<u8>, serde_json::Value>, op: WalOp) {
    match op {
        WalOp::Set { key, value } => {
            map.insert(key, value);
        }
        WalOp::Delete { key } => {
            map.remove(&key);
        }
    }
}

#[cfg(test)]
impl Store {
    /// Point the WAL at a read-only handle so writes fail until restored.
    pub(crate) fn replace_wal_file(&self, file: std::fs::File) -> std::fs::File {
        self.inner.lock().wal.replace_file(file)
    }

    pub(crate) fn wal_path(&self) -> PathBuf {
        self.dir.join(WAL_FILE)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

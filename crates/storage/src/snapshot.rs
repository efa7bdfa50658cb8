// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! A snapshot stores every live key/value of a store at a point in time,
//! identified by the WAL sequence number it covers. It is zstd-compressed
//! JSON, written to a temp file and renamed into place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::wal::rotate_bak_path;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
    #[error("unreadable snapshot: {0}")]
    Corrupt(String),
}

/// One key/value pair, key hex-encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version
    #[serde(rename = "v")]
    pub version: u32,
    /// WAL sequence number covered by this snapshot
    pub seq: u64,
    /// Live entries in key order
    pub entries: Vec<SnapshotEntry>,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new<'a>(
        seq: u64,
        entries: impl IntoIterator<Item = (&'a Vec<u8>, &'a serde_json::Value)>,
    ) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            seq,
            entries: entries
                .into_iter()
                .map(|(k, v)| SnapshotEntry { key: hex::encode(k), value: v.clone() })
                .collect(),
            created_at: Utc::now(),
        }
    }

    /// Decoded `(key, value)` pairs. Entries with an undecodable key are skipped.
    pub fn decoded_entries(self) -> impl Iterator<Item = (Vec<u8>, serde_json::Value)> {
        self.entries.into_iter().filter_map(|e| match hex::decode(&e.key) {
            Ok(key) => Some((key, e.value)),
            Err(err) => {
                tracing::warn!(key = %e.key, error = %err, "skipping snapshot entry with bad key");
                None
            }
        })
    }

    /// Atomically write the snapshot to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec(self)?;
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;

        let tmp = path.with_extension("snapshot.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Load the snapshot at `path`.
///
/// A missing file is `Ok(None)`. An undecodable one is
/// [`SnapshotError::Corrupt`] and left in place; whether the store can do
/// without it depends on what the WAL still holds.
pub fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match decode(&raw) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(SnapshotError::Version(v)) => Err(SnapshotError::Version(v)),
        Err(e) => Err(SnapshotError::Corrupt(e.to_string())),
    }
}

/// Move an unusable snapshot to a `.bak` backup. Returns the backup path.
pub fn set_aside(path: &Path) -> Result<PathBuf, SnapshotError> {
    let bak = rotate_bak_path(path);
    fs::rename(path, &bak)?;
    Ok(bak)
}

fn decode(raw: &[u8]) -> Result<Snapshot, SnapshotError> {
    let json = zstd::decode_all(raw)?;
    let snapshot: Snapshot = serde_json::from_slice(&json)?;
    if snapshot.version > CURRENT_SNAPSHOT_VERSION {
        return Err(SnapshotError::Version(snapshot.version));
    }
    Ok(snapshot)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log of key-value mutations.
//!
//! One JSON object per line: `{"seq": N, "op": "set", "key": "<hex>", "value": ...}`.
//! Sequence numbers are strictly increasing and continue across snapshots,
//! so a snapshot at seq `S` plus every entry after `S` rebuilds the store.
//!
//! A torn or corrupt tail (crash mid-write, disk garbage) is cut at the first
//! unreadable line on open; the original file is kept as a `.bak` backup.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single mutation recorded in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOp {
    Set {
        #[serde(with = "hex_bytes")]
        key: Vec<u8>,
        value: serde_json::Value,
    },
    Delete {
        #[serde(with = "hex_bytes")]
        key: Vec<u8>,
    },
}

/// A sequenced log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    #[serde(flatten)]
    pub op: WalOp,
}

/// Append-only mutation log backing one store.
pub struct Wal {
    path: PathBuf,
    file: File,
    buffer: Vec<u8>,
    /// Highest sequence number assigned so far
    write_seq: u64,
    /// Highest sequence number on disk
    flushed_seq: u64,
    /// Sequence already captured by a snapshot
    processed_seq: u64,
}

impl Wal {
    /// Open (or create) the log at `path`.
    ///
    /// `processed_seq` is the sequence covered by the current snapshot;
    /// numbering resumes after whichever is larger, that or the last entry.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let last_seq = if path.exists() { recover(path)? } else { 0 };
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            buffer: Vec::new(),
            write_seq: last_seq.max(processed_seq),
            flushed_seq: last_seq.max(processed_seq),
            processed_seq,
        })
    }

    /// Buffer an operation and return its sequence number.
    ///
    /// Nothing is durable until [`Wal::flush`] returns.
    pub fn append(&mut self, op: &WalOp) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let entry = WalEntry { seq, op: op.clone() };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.buffer.extend_from_slice(&line);
        self.write_seq = seq;
        Ok(seq)
    }

    /// Write buffered entries and sync them to disk.
    ///
    /// On failure every buffered entry is discarded and the file is cut back
    /// to its previous length, so an entry reported as failed never becomes
    /// durable later.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let len = match self.file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.discard_unflushed(None);
                return Err(e.into());
            }
        };
        if let Err(e) = self.file.write_all(&self.buffer).and_then(|()| self.file.sync_data()) {
            self.discard_unflushed(Some(len));
            return Err(e.into());
        }
        self.buffer.clear();
        self.flushed_seq = self.write_seq;
        Ok(())
    }

    /// Forget entries that never reached disk, truncating a partial write
    /// back to `len`.
    fn discard_unflushed(&mut self, len: Option<u64>) {
        tracing::warn!(
            path = %self.path.display(),
            dropped = self.write_seq - self.flushed_seq,
            "WAL flush failed, discarding unflushed entries"
        );
        self.buffer.clear();
        self.write_seq = self.flushed_seq;
        if let Some(len) = len {
            if let Err(e) = self.file.set_len(len).and_then(|()| self.file.sync_data()) {
                tracing::error!(path = %self.path.display(), error = %e, "failed to cut partial WAL write");
            }
        }
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    /// Record that everything up to `seq` is covered by a snapshot.
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    /// Entries whose sequence is greater than `seq`, in order.
    ///
    /// Reading stops at the first unreadable line.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let entries = read_valid_prefix(&self.path)?.0;
        Ok(entries.into_iter().filter(|e| e.seq > seq).collect())
    }

    /// Drop every entry with a sequence lower than `seq`.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;
        let keep: Vec<WalEntry> =
            read_valid_prefix(&self.path)?.0.into_iter().filter(|e| e.seq >= seq).collect();
        rewrite(&self.path, &keep)?;
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}

/// Sequence number of the first readable entry in the log at `path`.
pub fn first_seq(path: &Path) -> Result<Option<u64>, WalError> {
    Ok(read_valid_prefix(path)?.0.first().map(|e| e.seq))
}

/// Read entries until the first unreadable line.
///
/// Returns the entries and whether anything after them was discarded.
fn read_valid_prefix(path: &Path) -> Result<(Vec<WalEntry>, bool), WalError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), false)),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok((entries, false));
        }
        let text = match std::str::from_utf8(&line) {
            Ok(t) => t.trim_end(),
            Err(_) => return Ok((entries, true)),
        };
        if text.is_empty() {
            continue;
        }
        // A line without its newline is a torn write
        if !line.ends_with(b"\n") {
            return Ok((entries, true));
        }
        match serde_json::from_str::<WalEntry>(text) {
            Ok(entry) => entries.push(entry),
            Err(_) => return Ok((entries, true)),
        }
    }
}

/// Cut a corrupt tail, keeping the original as a backup. Returns the last valid seq.
fn recover(path: &Path) -> Result<u64, WalError> {
    let (entries, corrupt) = read_valid_prefix(path)?;
    if corrupt {
        let bak = rotate_bak_path(path);
        tracing::warn!(
            path = %path.display(),
            backup = %bak.display(),
            kept = entries.len(),
            "corrupt WAL tail, rotating to backup"
        );
        fs::rename(path, &bak)?;
        rewrite(path, &entries)?;
    }
    Ok(entries.last().map(|e| e.seq).unwrap_or(0))
}

fn rewrite(path: &Path, entries: &[WalEntry]) -> Result<(), WalError> {
    let tmp = path.with_extension("wal.tmp");
    {
        let mut file = File::create(&tmp)?;
        for entry in entries {
            serde_json::to_writer(&mut file, entry)?;
            file.write_all(b"\n")?;
        }
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

const MAX_BAK_FILES: u32 = 3;

/// Backup `n` of `path`: `store.wal.bak` for 1, `store.wal.bak.N` after.
pub(crate) fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    if n == 1 {
        name.push(".bak");
    } else {
        name.push(format!(".bak.{n}"));
    }
    PathBuf::from(name)
}

/// Pick the next backup path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let oldest = backup_path(path, MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = backup_path(path, n);
        if src.exists() {
            let _ = fs::rename(&src, backup_path(path, n + 1));
        }
    }

    backup_path(path, 1)
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
impl Wal {
    pub(crate) fn replace_file(&mut self, file: File) -> File {
        std::mem::replace(&mut self.file, file)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;

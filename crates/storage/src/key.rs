// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Order-preserving key encoding.
//!
//! A [`Key`] is a tuple of typed segments. Its byte encoding sorts exactly
//! like the tuple does, so a range scan over encoded bytes walks keys in
//! their logical order and a prefix range enumerates one "table":
//!
//! - string: `0x02`, bytes with `0x00` escaped as `0x00 0xFF`, then `0x00`
//! - u64: `0x15` followed by 8 big-endian bytes
//!
//! Every segment encoding is self-delimiting, so a shorter tuple is a byte
//! prefix of any tuple that extends it.

use thiserror::Error;

const TAG_STR: u8 = 0x02;
const TAG_U64: u8 = 0x15;
const ESCAPE: u8 = 0xFF;
/// Sorts after every segment tag; used as the exclusive end of a prefix range.
const PREFIX_END: u8 = 0xFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("unknown segment tag {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("truncated key at offset {0}")]
    Truncated(usize),
    #[error("string segment is not valid UTF-8")]
    Utf8,
}

/// One component of a [`Key`]. Strings sort before integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Str(String),
    U64(u64),
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Str(s.to_string())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Str(s)
    }
}

impl From<u64> for Segment {
    fn from(n: u64) -> Self {
        Segment::U64(n)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Str(s) => f.write_str(s),
            Segment::U64(n) => write!(f, "{n}"),
        }
    }
}

/// A composite key, e.g. `["job", "job-abc"]` or `["q", 42]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key(Vec<Segment>);

impl Key {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a segment (builder style).
    pub fn push(mut self, segment: impl Into<Segment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// The last segment, usually the record's own identifier.
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for segment in &self.0 {
            match segment {
                Segment::Str(s) => {
                    out.push(TAG_STR);
                    for &b in s.as_bytes() {
                        out.push(b);
                        if b == 0x00 {
                            out.push(ESCAPE);
                        }
                    }
                    out.push(0x00);
                }
                Segment::U64(n) => {
                    out.push(TAG_U64);
                    out.extend_from_slice(&n.to_be_bytes());
                }
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut segments = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                TAG_STR => {
                    i += 1;
                    let mut raw = Vec::new();
                    loop {
                        let Some(&b) = bytes.get(i) else {
                            return Err(KeyError::Truncated(i));
                        };
                        i += 1;
                        if b != 0x00 {
                            raw.push(b);
                            continue;
                        }
                        if bytes.get(i) == Some(&ESCAPE) {
                            raw.push(0x00);
                            i += 1;
                            continue;
                        }
                        break;
                    }
                    let s = String::from_utf8(raw).map_err(|_| KeyError::Utf8)?;
                    segments.push(Segment::Str(s));
                }
                TAG_U64 => {
                    let end = i + 9;
                    let Some(raw) = bytes.get(i + 1..end) else {
                        return Err(KeyError::Truncated(bytes.len()));
                    };
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(raw);
                    segments.push(Segment::U64(u64::from_be_bytes(buf)));
                    i = end;
                }
                tag => return Err(KeyError::UnknownTag { tag, offset: i }),
            }
        }
        Ok(Self(segments))
    }

    /// Encoded `(from, to)` bounds covering this key and every key that
    /// extends it: `from` inclusive, `to` exclusive.
    pub fn prefix_range(&self) -> (Vec<u8>, Vec<u8>) {
        let from = self.encode();
        let mut to = from.clone();
        to.push(PREFIX_END);
        (from, to)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join(":"))
    }
}

impl<S: Into<Segment>> FromIterator<S> for Key {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;

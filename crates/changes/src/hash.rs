// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content hashing of workspace files.

use bilt_core::DELETED_HASH;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::detect::DetectError;

/// Hex SHA-256 of a file's contents, or `None` if it does not exist.
pub fn hash_file(path: &Path) -> io::Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(Some(format!("{:x}", hasher.finalize())))
}

/// Hash each workspace-relative path under `root`.
///
/// Missing files hash to [`DELETED_HASH`]. Directories (e.g. submodules)
/// carry no content of their own and are left out.
pub fn hash_workspace_files<'a>(
    root: &Path,
    files: impl IntoIterator<Item = &'a PathBuf>,
) -> Result<IndexMap<PathBuf, String>, DetectError> {
    let mut hashes = IndexMap::new();
    for rel in files {
        let abs = root.join(rel);
        if abs.is_dir() {
            tracing::debug!(path = %rel.display(), "skipping directory");
            continue;
        }
        let hash = hash_file(&abs)
            .map_err(|source| DetectError::Io { path: abs.clone(), source })?
            .unwrap_or_else(|| DELETED_HASH.to_string());
        hashes.insert(rel.clone(), hash);
    }
    Ok(hashes)
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;

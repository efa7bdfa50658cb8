// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical `.biltignore` filtering.
//!
//! Each directory may hold a `.biltignore` in gitignore syntax, rooted at
//! that directory. For a given file, the ignore files from the file's own
//! directory up to the workspace root are consulted deepest first, and the
//! first one with a decisive match (ignore, or `!` whitelist) wins.

use ::ignore::gitignore::{Gitignore, GitignoreBuilder};
use ::ignore::Match;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

pub const IGNORE_FILE: &str = ".biltignore";

/// Ignore matchers for one workspace, loaded lazily per directory.
///
/// Meant to live for a single filtering pass; nothing is cached beyond it.
pub struct IgnoreMask {
    root: PathBuf,
    by_dir: HashMap<PathBuf, Option<Gitignore>>,
}

impl IgnoreMask {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf(), by_dir: HashMap::new() }
    }

    /// Whether the workspace-relative `rel` is excluded by some `.biltignore`.
    pub fn is_ignored(&mut self, rel: &Path) -> bool {
        // Only plain relative paths can be placed under an ignore root
        if rel.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            return false;
        }

        let path = self.root.join(rel);
        for dir in rel.ancestors().skip(1) {
            let Some(matcher) = self.matcher(dir) else {
                continue;
            };
            match matcher.matched_path_or_any_parents(&path, false) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }

    fn matcher(&mut self, dir: &Path) -> Option<&Gitignore> {
        let root = &self.root;
        self.by_dir.entry(dir.to_path_buf()).or_insert_with(|| load(&root.join(dir))).as_ref()
    }
}

fn load(dir: &Path) -> Option<Gitignore> {
    let file = dir.join(IGNORE_FILE);
    if !file.is_file() {
        return None;
    }

    let mut builder = GitignoreBuilder::new(dir);
    if let Some(e) = builder.add(&file) {
        // Lines that parse are still kept
        tracing::warn!(path = %file.display(), error = %e, "problem reading ignore file");
    }
    match builder.build() {
        Ok(matcher) if !matcher.is_empty() => Some(matcher),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(path = %file.display(), error = %e, "skipping ignore file");
            None
        }
    }
}

/// Drop every path excluded by the workspace's `.biltignore` files,
/// keeping the order of the rest.
pub fn filter_ignored(root: &Path, files: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut mask = IgnoreMask::new(root);
    files
        .into_iter()
        .filter(|rel| {
            let ignored = mask.is_ignored(rel);
            if ignored {
                tracing::trace!(path = %rel.display(), "ignored");
            }
            !ignored
        })
        .collect()
}

#[cfg(test)]
#[path = "ignore_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot of a workspace as of a build.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hash recorded for a path the VCS reports as changed but which no longer
/// exists on disk. Deleted files must still show up in a diff.
pub const DELETED_HASH: &str = "deleted";

/// The state a workspace was in as of a build.
///
/// `commit` is the base revision (`None` outside version control);
/// `changed_files_in_workspace` maps every uncommitted changed path,
/// relative to the workspace root, to its content hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoBuildInfo {
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default)]
    pub changed_files_in_workspace: IndexMap<PathBuf, String>,
}

impl RepoBuildInfo {
    pub fn new(commit: Option<String>, changed_files_in_workspace: IndexMap<PathBuf, String>) -> Self {
        Self { commit, changed_files_in_workspace }
    }

    /// True when the base revision is the same as `other`'s.
    pub fn same_commit(&self, other: &RepoBuildInfo) -> bool {
        self.commit == other.commit
    }

    pub fn is_deleted(&self, path: &std::path::Path) -> bool {
        self.changed_files_in_workspace.get(path).is_some_and(|h| h == DELETED_HASH)
    }
}

#[cfg(test)]
#[path = "build_info_tests.rs"]
mod tests;

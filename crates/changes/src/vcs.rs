// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("{command}: failed to spawn: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command}: timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("{command}: exited with {code:?}: {stderr}")]
    Failed { command: String, code: Option<i32>, stderr: String },
}

/// Read-only view of the version control system a workspace lives in.
///
/// Paths are relative to the workspace directory, which may be the
/// repository root or any directory below it. Files outside the workspace
/// are never reported.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Revision checked out in `dir`, or `None` when `dir` is not under
    /// version control (or has no commits yet).
    async fn current_revision(&self, dir: &Path) -> Result<Option<String>, VcsError>;

    /// Files modified, added, deleted or untracked in the working tree.
    async fn changed_files_in_workspace(&self, dir: &Path) -> Result<Vec<PathBuf>, VcsError>;

    /// Files that differ between two revisions.
    async fn changed_files_between(&self, dir: &Path, from: &str, to: &str) -> Result<Vec<PathBuf>, VcsError>;

    /// Every file tracked at `rev`.
    async fn files_at_revision(&self, dir: &Path, rev: &str) -> Result<Vec<PathBuf>, VcsError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{Vcs, VcsError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeVcsState {
        revision: Option<String>,
        workspace: Vec<PathBuf>,
        diffs: HashMap<(String, String), Vec<PathBuf>>,
        trees: HashMap<String, Vec<PathBuf>>,
        calls: Vec<String>,
    }

    /// In-memory VCS for tests
    #[derive(Clone, Default)]
    pub struct FakeVcs {
        inner: Arc<Mutex<FakeVcsState>>,
    }

    fn paths(files: &[&str]) -> Vec<PathBuf> {
        files.iter().map(PathBuf::from).collect()
    }

    impl FakeVcs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_revision(&self, rev: Option<&str>) {
            self.inner.lock().revision = rev.map(String::from);
        }

        pub fn set_workspace_changes(&self, files: &[&str]) {
            self.inner.lock().workspace = paths(files);
        }

        pub fn set_diff(&self, from: &str, to: &str, files: &[&str]) {
            self.inner.lock().diffs.insert((from.to_string(), to.to_string()), paths(files));
        }

        pub fn set_tree(&self, rev: &str, files: &[&str]) {
            self.inner.lock().trees.insert(rev.to_string(), paths(files));
        }

        /// Names of the queries made so far, e.g. `"diff a..b"`
        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl Vcs for FakeVcs {
        async fn current_revision(&self, _dir: &Path) -> Result<Option<String>, VcsError> {
            let mut state = self.inner.lock();
            state.calls.push("revision".to_string());
            Ok(state.revision.clone())
        }

        async fn changed_files_in_workspace(&self, _dir: &Path) -> Result<Vec<PathBuf>, VcsError> {
            let mut state = self.inner.lock();
            state.calls.push("status".to_string());
            Ok(state.workspace.clone())
        }

        async fn changed_files_between(&self, _dir: &Path, from: &str, to: &str) -> Result<Vec<PathBuf>, VcsError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("diff {from}..{to}"));
            Ok(state.diffs.get(&(from.to_string(), to.to_string())).cloned().unwrap_or_default())
        }

        async fn files_at_revision(&self, _dir: &Path, rev: &str) -> Result<Vec<PathBuf>, VcsError> {
            let mut state = self.inner.lock();
            state.calls.push(format!("tree {rev}"));
            Ok(state.trees.get(rev).cloned().unwrap_or_default())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeVcs;

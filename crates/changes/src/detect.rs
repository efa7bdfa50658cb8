// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Changed-file detection across builds.
//!
//! - Fast path: the base revision has not moved since the last build, so
//!   only the uncommitted changes can differ. Compare hashes directly.
//! - Slow path: the base revision moved. Re-hash everything that was dirty
//!   at the last build, add everything dirty now, and add the VCS diff
//!   between the two revisions.

use bilt_core::RepoBuildInfo;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use crate::build_info::{read_last_build_info, STATE_DIR_NAME};
use crate::hash::hash_workspace_files;
use crate::ignore::filter_ignored;
use crate::vcs::{Vcs, VcsError};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// What needs rebuilding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSet {
    /// No prior build is recorded
    Everything,
    Files(Vec<PathBuf>),
}

impl ChangeSet {
    pub fn is_everything(&self) -> bool {
        matches!(self, ChangeSet::Everything)
    }

    /// Whether `path` must be treated as changed.
    pub fn contains(&self, path: &Path) -> bool {
        match self {
            ChangeSet::Everything => true,
            ChangeSet::Files(files) => files.iter().any(|f| f == path),
        }
    }

    pub fn files(&self) -> Option<&[PathBuf]> {
        match self {
            ChangeSet::Everything => None,
            ChangeSet::Files(files) => Some(files),
        }
    }
}

/// Result of [`files_changed_since_last_build`].
#[derive(Debug, Clone)]
pub struct Changes {
    pub changed: ChangeSet,
    /// State of the workspace now; record it once the build succeeds.
    pub current: RepoBuildInfo,
}

/// Snapshot the workspace: its base revision and the hashes of every
/// uncommitted, non-ignored change.
///
/// bilt state is expected in the default `.bilt` directory; see
/// [`scan_workspace`] for a relocated one.
pub async fn find_changes_in_current_repo<V: Vcs + ?Sized>(
    dir: &Path,
    vcs: &V,
) -> Result<RepoBuildInfo, DetectError> {
    scan_workspace(dir, vcs, Path::new(STATE_DIR_NAME)).await
}

/// [`find_changes_in_current_repo`] with bilt state kept in `state_dir`
/// (absolute, or relative to `dir`).
pub async fn scan_workspace<V: Vcs + ?Sized>(
    dir: &Path,
    vcs: &V,
    state_dir: &Path,
) -> Result<RepoBuildInfo, DetectError> {
    let commit = vcs.current_revision(dir).await?;
    let files = match commit {
        Some(_) => vcs.changed_files_in_workspace(dir).await?,
        None => Vec::new(),
    };
    let files = filter_ignored(dir, without_state_dir(dir, state_dir, files));
    let changed_files_in_workspace = hash_workspace_files(dir, &files)?;

    tracing::debug!(
        commit = ?commit,
        dirty = changed_files_in_workspace.len(),
        "scanned workspace"
    );
    Ok(RepoBuildInfo { commit, changed_files_in_workspace })
}

/// Files that changed between the `last` build and the `current` state.
pub async fn calculate_files_changed_since_last_build<V: Vcs + ?Sized>(
    dir: &Path,
    vcs: &V,
    last: &RepoBuildInfo,
    current: &RepoBuildInfo,
) -> Result<Vec<PathBuf>, DetectError> {
    changed_between_builds(dir, vcs, last, current, Path::new(STATE_DIR_NAME)).await
}

/// [`calculate_files_changed_since_last_build`] with bilt state kept in
/// `state_dir`.
pub async fn changed_between_builds<V: Vcs + ?Sized>(
    dir: &Path,
    vcs: &V,
    last: &RepoBuildInfo,
    current: &RepoBuildInfo,
    state_dir: &Path,
) -> Result<Vec<PathBuf>, DetectError> {
    if last.same_commit(current) {
        let changed = determine_changed_files(&current.changed_files_in_workspace, &last.changed_files_in_workspace);
        tracing::debug!(changed = changed.len(), "fast path");
        return Ok(filter_ignored(dir, without_state_dir(dir, state_dir, changed)));
    }

    let rehashed = hash_workspace_files(dir, last.changed_files_in_workspace.keys())?;
    let mut changed: IndexSet<PathBuf> =
        determine_changed_files(&rehashed, &last.changed_files_in_workspace).into_iter().collect();
    changed.extend(current.changed_files_in_workspace.keys().cloned());

    let history = match (&last.commit, &current.commit) {
        (Some(from), Some(to)) => vcs.changed_files_between(dir, from, to).await?,
        (None, Some(to)) => vcs.files_at_revision(dir, to).await?,
        (_, None) => Vec::new(),
    };
    changed.extend(history);

    tracing::debug!(
        from = ?last.commit,
        to = ?current.commit,
        changed = changed.len(),
        "slow path"
    );
    Ok(filter_ignored(dir, without_state_dir(dir, state_dir, changed)))
}

/// `state_dir` as a workspace-relative path, or `None` when it lies outside `dir`.
fn state_dir_in_workspace(dir: &Path, state_dir: &Path) -> Option<PathBuf> {
    let rel = state_dir.strip_prefix(dir).unwrap_or(state_dir);
    if rel.is_absolute() {
        return None;
    }
    let rel: PathBuf = rel.components().filter(|c| !matches!(c, Component::CurDir)).collect();
    Some(rel).filter(|r| !r.as_os_str().is_empty())
}

/// bilt's own state is never part of the workspace, even when committed.
fn without_state_dir(
    dir: &Path,
    state_dir: &Path,
    files: impl IntoIterator<Item = PathBuf>,
) -> impl Iterator<Item = PathBuf> {
    let state = state_dir_in_workspace(dir, state_dir);
    files.into_iter().filter(move |f| !state.as_ref().is_some_and(|s| f.starts_with(s)))
}

/// Paths whose hash differs between two snapshots.
///
/// Paths new or modified in `current` come first, in `current`'s order,
/// followed by paths only in `previous`, in `previous`'s order.
pub fn determine_changed_files(
    current: &IndexMap<PathBuf, String>,
    previous: &IndexMap<PathBuf, String>,
) -> Vec<PathBuf> {
    let changed = current.iter().filter(|(path, hash)| previous.get(*path) != Some(*hash)).map(|(path, _)| path);
    let removed = previous.keys().filter(|path| !current.contains_key(*path));
    changed.chain(removed).cloned().collect()
}

/// Compare the workspace against the last build recorded in the default
/// `<dir>/.bilt` state directory.
pub async fn files_changed_since_last_build<V: Vcs + ?Sized>(dir: &Path, vcs: &V) -> Result<Changes, DetectError> {
    let state_dir = dir.join(STATE_DIR_NAME);
    changes_since(dir, vcs, read_last_build_info(dir), &state_dir).await
}

/// Compare the workspace against `last`; `None` means everything changed.
pub async fn changes_since<V: Vcs + ?Sized>(
    dir: &Path,
    vcs: &V,
    last: Option<RepoBuildInfo>,
    state_dir: &Path,
) -> Result<Changes, DetectError> {
    let current = scan_workspace(dir, vcs, state_dir).await?;
    let changed = match last {
        Some(last) => ChangeSet::Files(changed_between_builds(dir, vcs, &last, &current, state_dir).await?),
        None => {
            tracing::info!("no prior build recorded, everything changed");
            ChangeSet::Everything
        }
    };
    Ok(Changes { changed, current })
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;

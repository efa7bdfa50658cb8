// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bilt-changes: which files changed since the last successful build.
//!
//! The current state of a workspace is its base revision plus the content
//! hashes of every uncommitted change. Comparing that against the state
//! recorded after the previous build yields the changed-file set, either
//! directly (same base revision) or by also diffing VCS history.

mod build_info;
mod detect;
mod git;
mod hash;
mod ignore;
pub mod subprocess;
mod vcs;

pub use build_info::{
    build_info_path, read_build_info, read_last_build_info, save_build_info, save_last_build_info,
    BUILD_INFO_FILE, STATE_DIR_NAME,
};
pub use detect::{
    calculate_files_changed_since_last_build, changed_between_builds, changes_since, determine_changed_files,
    files_changed_since_last_build, find_changes_in_current_repo, scan_workspace, ChangeSet, Changes, DetectError,
};
pub use git::GitCli;
pub use hash::{hash_file, hash_workspace_files};
pub use crate::ignore::{filter_ignored, IgnoreMask, IGNORE_FILE};
pub use vcs::{Vcs, VcsError};

#[cfg(any(test, feature = "test-support"))]
pub use vcs::FakeVcs;

#[cfg(test)]
mod test_repo;

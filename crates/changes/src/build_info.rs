// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The record of the workspace as of the last successful build.
//!
//! One JSON file per workspace, `<root>/.bilt/last-build.json`, replaced
//! atomically on every successful build. A missing or unreadable file
//! means "no prior build", which forces a full rebuild.

use bilt_core::RepoBuildInfo;
use std::path::{Path, PathBuf};

/// Directory under the workspace root holding bilt's state
pub const STATE_DIR_NAME: &str = ".bilt";
pub const BUILD_INFO_FILE: &str = "last-build.json";

pub fn build_info_path(dir: &Path) -> PathBuf {
    dir.join(STATE_DIR_NAME).join(BUILD_INFO_FILE)
}

pub fn read_last_build_info(dir: &Path) -> Option<RepoBuildInfo> {
    read_build_info(&build_info_path(dir))
}

pub fn save_last_build_info(dir: &Path, info: &RepoBuildInfo) -> std::io::Result<()> {
    save_build_info(&build_info_path(dir), info)
}

/// Read a build-info file. Absent, unreadable and corrupt files are all `None`.
pub fn read_build_info(path: &Path) -> Option<RepoBuildInfo> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable build info, treating as no prior build");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(info) => Some(info),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt build info, treating as no prior build");
            None
        }
    }
}

/// Atomically replace the build-info file, creating its directory.
pub fn save_build_info(path: &Path, info: &RepoBuildInfo) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(info).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), commit = ?info.commit, files = info.changed_files_in_workspace.len(), "saved build info");
    Ok(())
}

#[cfg(test)]
#[path = "build_info_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.

use std::path::PathBuf;
use std::time::Duration;

/// State directory override (`BILT_STATE_DIR`). Relative paths are taken
/// from the workspace root.
pub fn state_dir() -> Option<PathBuf> {
    std::env::var("BILT_STATE_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Per-invocation git timeout override (`BILT_GIT_TIMEOUT_MS`)
pub fn git_timeout() -> Option<Duration> {
    std::env::var("BILT_GIT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Tracing filter directives (`BILT_LOG`, default `warn`)
pub fn log_filter() -> String {
    std::env::var("BILT_LOG").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "warn".to_string())
}

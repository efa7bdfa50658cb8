// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace configuration: where state lives and how it is tuned.

use bilt_changes::{subprocess::GIT_TIMEOUT, GitCli, BUILD_INFO_FILE, STATE_DIR_NAME};
use bilt_storage::StoreOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::env;

/// Optional tuning file inside the state directory
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    compact_threshold: Option<u64>,
    git_timeout_ms: Option<u64>,
}

/// Resolved configuration for one workspace
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace (and repository) root
    pub root: PathBuf,
    /// bilt state directory (default `<root>/.bilt`)
    pub state_dir: PathBuf,
    /// Durable job queue store
    pub queue_dir: PathBuf,
    /// Job state and plugin key-value store
    pub kv_dir: PathBuf,
    /// Record of the last successful build
    pub build_info_path: PathBuf,
    /// WAL records between store compactions
    pub compact_threshold: u64,
    /// Deadline for each git invocation
    pub git_timeout: Duration,
}

impl Config {
    /// Load configuration for the workspace at `root`.
    ///
    /// Precedence: environment, then `<state dir>/config.toml`, then defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let state_dir = match env::state_dir() {
            Some(dir) => root.join(dir),
            None => root.join(STATE_DIR_NAME),
        };
        let file = read_file_config(&state_dir.join(CONFIG_FILE))?;

        let mut config = Self::with_state_dir(root, state_dir);
        if let Some(threshold) = file.compact_threshold {
            config.compact_threshold = threshold;
        }
        if let Some(ms) = file.git_timeout_ms {
            config.git_timeout = Duration::from_millis(ms);
        }
        if let Some(timeout) = env::git_timeout() {
            config.git_timeout = timeout;
        }
        Ok(config)
    }

    /// Defaults for `root`, ignoring the environment and config file.
    pub fn for_root(root: &Path) -> Self {
        Self::with_state_dir(root, root.join(STATE_DIR_NAME))
    }

    fn with_state_dir(root: &Path, state_dir: PathBuf) -> Self {
        Self {
            root: root.to_path_buf(),
            queue_dir: state_dir.join("queue"),
            kv_dir: state_dir.join("kv"),
            build_info_path: state_dir.join(BUILD_INFO_FILE),
            state_dir,
            compact_threshold: StoreOptions::default().compact_threshold,
            git_timeout: GIT_TIMEOUT,
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions { compact_threshold: self.compact_threshold }
    }

    pub fn git(&self) -> GitCli {
        GitCli::with_timeout(self.git_timeout)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
    };
    toml::from_str(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

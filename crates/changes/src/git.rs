// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! [`Vcs`] backed by the `git` command line.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, GIT_TIMEOUT};
use crate::vcs::{Vcs, VcsError};

#[derive(Debug, Clone, Copy)]
pub struct GitCli {
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self { timeout: GIT_TIMEOUT }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(dir: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir).args(args).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
        cmd
    }

    /// Run git and require a zero exit status.
    async fn run(&self, dir: &Path, args: &[&str], label: &str) -> Result<Output, VcsError> {
        let output = run_with_timeout(Self::command(dir, args), self.timeout, label).await?;
        if !output.status.success() {
            return Err(VcsError::Failed {
                command: label.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Path of `dir` below the repository root (`rev-parse --show-prefix`),
    /// empty at the root.
    async fn prefix(&self, dir: &Path) -> Result<PathBuf, VcsError> {
        let output = self.run(dir, &["rev-parse", "--show-prefix"], "git rev-parse --show-prefix").await?;
        let prefix = String::from_utf8_lossy(&output.stdout);
        Ok(PathBuf::from(prefix.trim_end_matches(['\n', '\r'])))
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn current_revision(&self, dir: &Path) -> Result<Option<String>, VcsError> {
        let cmd = Self::command(dir, &["rev-parse", "--verify", "--quiet", "HEAD"]);
        let output = match run_with_timeout(cmd, self.timeout, "git rev-parse").await {
            Ok(output) => output,
            Err(VcsError::Spawn { source, .. }) => {
                tracing::debug!(error = %source, "git unavailable, treating workspace as unversioned");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if !output.status.success() {
            tracing::debug!(dir = %dir.display(), "no git revision");
            return Ok(None);
        }
        let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(rev).filter(|r| !r.is_empty()))
    }

    async fn changed_files_in_workspace(&self, dir: &Path) -> Result<Vec<PathBuf>, VcsError> {
        let output =
            self.run(dir, &["status", "--porcelain=v1", "-z", "--untracked-files=all"], "git status").await?;
        Ok(under_prefix(&self.prefix(dir).await?, parse_porcelain(&output.stdout)))
    }

    async fn changed_files_between(&self, dir: &Path, from: &str, to: &str) -> Result<Vec<PathBuf>, VcsError> {
        // --no-renames so a rename shows up as both its old and new path
        let output = self.run(dir, &["diff", "--name-only", "--no-renames", "-z", from, to], "git diff").await?;
        Ok(under_prefix(&self.prefix(dir).await?, split_nul(&output.stdout)))
    }

    async fn files_at_revision(&self, dir: &Path, rev: &str) -> Result<Vec<PathBuf>, VcsError> {
        let output =
            self.run(dir, &["ls-tree", "-r", "--full-tree", "--name-only", "-z", rev], "git ls-tree").await?;
        Ok(under_prefix(&self.prefix(dir).await?, split_nul(&output.stdout)))
    }
}

fn to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

fn split_nul(out: &[u8]) -> Vec<PathBuf> {
    out.split(|b| *b == 0).filter(|f| !f.is_empty()).map(to_path).collect()
}

/// Re-root repository paths at the workspace: paths outside `prefix` are
/// dropped and the rest lose it.
pub(crate) fn under_prefix(prefix: &Path, files: Vec<PathBuf>) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter_map(|f| f.strip_prefix(prefix).ok().map(Path::to_path_buf))
        .filter(|f| !f.as_os_str().is_empty())
        .collect()
}

/// Parse `git status --porcelain=v1 -z`.
///
/// Each record is `XY <path>\0`; a rename (`R`) is followed by a second
/// record holding the original path, and both are reported. A copy (`C`)
/// also carries its source, which is unchanged and skipped.
pub(crate) fn parse_porcelain(out: &[u8]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut records = out.split(|b| *b == 0).filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        if record.len() < 4 {
            tracing::warn!(record = %String::from_utf8_lossy(record), "skipping malformed status record");
            continue;
        }
        let status = &record[..2];
        files.push(to_path(&record[3..]));

        let renamed = status.contains(&b'R');
        if renamed || status.contains(&b'C') {
            if let Some(source) = records.next() {
                if renamed {
                    files.push(to_path(source));
                }
            }
        }
    }
    files
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;

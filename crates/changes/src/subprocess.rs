// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with a deadline.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use crate::vcs::VcsError;

/// Default deadline for a single `git` invocation
pub const GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// A non-zero exit status is not an error here; callers inspect
/// `output.status` themselves.
pub async fn run_with_timeout(mut cmd: Command, timeout: Duration, description: &str) -> Result<Output, VcsError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(VcsError::Spawn { command: description.to_string(), source }),
        Err(_) => {
            tracing::warn!(command = description, ?timeout, "subprocess timed out");
            Err(VcsError::Timeout { command: description.to_string(), timeout })
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bilt record` - mark the workspace as successfully built

use anyhow::{Context, Result};
use bilt_changes::{save_build_info, scan_workspace};
use bilt_core::RepoBuildInfo;
use bilt_engine::Config;

use crate::output::{format_or_json, OutputFormat};

pub async fn handle(config: &Config, format: OutputFormat) -> Result<()> {
    let info = scan_workspace(&config.root, &config.git(), &config.state_dir).await?;
    save_build_info(&config.build_info_path, &info)
        .with_context(|| format!("failed to write {}", config.build_info_path.display()))?;
    tracing::info!(path = %config.build_info_path.display(), "recorded build");

    format_or_json(format, &info, || println!("{}", summary(&info)))
}

pub(crate) fn summary(info: &RepoBuildInfo) -> String {
    let base = match &info.commit {
        Some(commit) => format!("at {}", bilt_core::short(commit, 12)),
        None => "without a revision".to_string(),
    };
    match info.changed_files_in_workspace.len() {
        0 => format!("Recorded build {base}"),
        1 => format!("Recorded build {base} with 1 uncommitted file"),
        n => format!("Recorded build {base} with {n} uncommitted files"),
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bilt changed` - files changed since the last recorded build

use anyhow::Result;
use bilt_changes::{changes_since, read_build_info, ChangeSet};
use bilt_engine::Config;
use clap::Args;
use serde_json::json;

use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct ChangedArgs {
    /// Exit with status 1 when anything changed
    #[arg(long)]
    pub exit_code: bool,
}

pub async fn handle(args: ChangedArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let last = read_build_info(&config.build_info_path);
    let changes = changes_since(&config.root, &config.git(), last, &config.state_dir).await?;

    format_or_json(format, &to_json(&changes.changed), || {
        let text = render_text(&changes.changed);
        if !text.is_empty() {
            println!("{text}");
        }
    })?;

    let nothing_changed = matches!(&changes.changed, ChangeSet::Files(files) if files.is_empty());
    if args.exit_code && !nothing_changed {
        return Err(ExitError::silent(1).into());
    }
    Ok(())
}

pub(crate) fn to_json(changed: &ChangeSet) -> serde_json::Value {
    match changed {
        ChangeSet::Everything => json!({ "everything": true }),
        ChangeSet::Files(files) => json!({ "everything": false, "files": files }),
    }
}

pub(crate) fn render_text(changed: &ChangeSet) -> String {
    match changed {
        ChangeSet::Everything => "everything".to_string(),
        ChangeSet::Files(files) => files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>().join("\n"),
    }
}

#[cfg(test)]
#[path = "changed_tests.rs"]
mod tests;

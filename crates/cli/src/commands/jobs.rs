// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bilt jobs` - inspect and clear jobs left over from an interrupted run

use std::sync::Arc;

use anyhow::Result;
use bilt_core::{Event, JobOutcome, JobStateRecord};
use bilt_engine::{Config, Dispatcher, RunnerRegistry};
use clap::{Args, Subcommand};

use crate::output::{format_or_json, render_table, OutputFormat};

#[derive(Args, Debug, Default)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: Option<JobsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// End every outstanding job without running it
    Clear,
}

pub async fn handle(args: JobsArgs, config: &Config, format: OutputFormat) -> Result<()> {
    // Never started: nothing here runs jobs
    let mut dispatcher = Dispatcher::open(config, Arc::new(RunnerRegistry::new()))?;
    match args.command {
        None => {
            let records = dispatcher.aborted_jobs()?;
            format_or_json(format, &records, || {
                if records.is_empty() {
                    println!("No aborted jobs");
                } else {
                    println!("{}", render_records(&records));
                }
            })
        }
        Some(JobsCommand::Clear) => {
            for record in dispatcher.aborted_jobs()? {
                dispatcher.events().publish(Event::EndJob {
                    job: record.job,
                    outcome: JobOutcome::Failed { error: "cleared".to_string() },
                });
            }
            let cleared = dispatcher.apply_pending_events().await;
            tracing::info!(cleared, "cleared aborted jobs");
            format_or_json(format, &serde_json::json!({ "cleared": cleared }), || {
                println!("Cleared {cleared} job{}", if cleared == 1 { "" } else { "s" });
            })
        }
    }
}

pub(crate) fn render_records(records: &[JobStateRecord]) -> String {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.job.id.to_string(),
                r.job.kind.clone(),
                r.awakened_from.as_ref().map_or_else(|| "-".to_string(), ToString::to_string),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&["ID", "TYPE", "AWAKENED FROM"], &rows)
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! bilt - incremental build orchestration for a single repository

mod commands;
mod exit_error;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use bilt_engine::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{changed, jobs, record};
use crate::exit_error::ExitError;
use crate::output::OutputFormat;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BILT_BUILD_REVISION"), ")");

#[derive(Parser, Debug)]
#[command(name = "bilt", version = VERSION, about = "Build only what changed since the last good build")]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List files changed since the last recorded build
    Changed(changed::ChangedArgs),
    /// Record the current workspace as successfully built
    Record,
    /// Show jobs an interrupted run left behind
    Jobs(jobs::JobsArgs),
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run(Cli::parse()).await {
        if let Some(exit) = e.downcast_ref::<ExitError>() {
            if !exit.message.is_empty() {
                eprintln!("{}", exit.message);
            }
            std::process::exit(exit.code);
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let config = Config::load(&root)?;
    tracing::debug!(root = %config.root.display(), state = %config.state_dir.display(), "loaded config");

    match cli.command {
        Commands::Changed(args) => changed::handle(args, &config, cli.output).await,
        Commands::Record => record::handle(&config, cli.output).await,
        Commands::Jobs(args) => jobs::handle(args, &config, cli.output).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_new(bilt_engine::env::log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

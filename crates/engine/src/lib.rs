// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bilt-engine: durable job dispatch for the bilt build orchestrator.
//!
//! Jobs are persisted to the key-value store before they are queued, run
//! without waiting on one another, and forgotten only when an end-of-job
//! event arrives. Whatever is still recorded at startup was interrupted
//! and can be replayed.

mod config;
mod dispatcher;
pub mod env;
mod event_bus;
mod runner;

pub use config::{Config, ConfigError, CONFIG_FILE};
pub use dispatcher::{job_key, DispatchError, DispatchHandle, Dispatcher};
pub use event_bus::EventBus;
pub use runner::{JobRunner, RunContext, RunnerError, RunnerRegistry};

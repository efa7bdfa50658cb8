// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bilt-core: domain types shared by the bilt build orchestrator

pub mod macros;

pub mod build_info;
pub mod event;
pub mod id;
pub mod job;

pub use build_info::{RepoBuildInfo, DELETED_HASH};
pub use event::{Event, JobOutcome};
pub use id::short;
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{Job, JobId, JobStateRecord, QueueEntry};

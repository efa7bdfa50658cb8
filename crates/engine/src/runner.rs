// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The contract between the dispatcher and whatever executes jobs.

use async_trait::async_trait;
use bilt_core::{Event, Job, JobId, JobOutcome};
use bilt_storage::{StorageError, Store};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::dispatcher::{DispatchError, DispatchHandle};
use crate::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("no runner registered for job type {0:?}")]
    UnknownKind(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Everything a running job may use.
#[derive(Clone)]
pub struct RunContext {
    /// Job whose completion caused this one to be dispatched
    pub awakened_from: Option<JobId>,
    /// Shared key-value store for job-type specific state
    pub kv: Arc<Store>,
    /// For dispatching follow-up jobs
    pub dispatch: DispatchHandle,
    pub events: EventBus,
}

impl RunContext {
    /// Announce that `job` is over, successfully or not. Its persisted
    /// state is removed once the dispatcher sees the event.
    pub fn end_job(&self, job: &Job, outcome: JobOutcome) {
        self.events.publish(Event::EndJob { job: job.clone(), outcome });
    }
}

/// Executes jobs handed out by the dispatcher.
///
/// A runner is expected to publish [`Event::EndJob`] for every job it is
/// given, including failed ones; until then the job counts as aborted.
/// An `Err` from [`JobRunner::run`] is only logged.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, job: Job, ctx: RunContext) -> Result<(), RunnerError>;

    /// Remove job-type specific entries from `kv` once `job` has ended.
    async fn delete_job_state(&self, _job: &Job, _kv: &Store) -> Result<(), RunnerError> {
        Ok(())
    }
}

/// Routes jobs to runners by job type.
#[derive(Clone, Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn JobRunner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: impl Into<String>, runner: Arc<dyn JobRunner>) -> Self {
        self.runners.insert(kind.into(), runner);
        self
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

#[async_trait]
impl JobRunner for RunnerRegistry {
    async fn run(&self, job: Job, ctx: RunContext) -> Result<(), RunnerError> {
        match self.runners.get(&job.kind) {
            Some(runner) => runner.run(job, ctx).await,
            None => Err(RunnerError::UnknownKind(job.kind)),
        }
    }

    async fn delete_job_state(&self, job: &Job, kv: &Store) -> Result<(), RunnerError> {
        match self.runners.get(&job.kind) {
            Some(runner) => runner.delete_job_state(job, kv).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

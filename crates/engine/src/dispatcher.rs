// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable job dispatch.
//!
//! `dispatch_job` records the job under `["job", id]` and only then queues
//! it, so a crash in between still leaves the job visible to recovery. The
//! execution loop hands each queued job to the runner without waiting for
//! it to finish. A record is removed only when an [`Event::EndJob`] for its
//! job is processed; whatever is still recorded at startup was aborted.

use bilt_core::{Event, Job, JobId, JobStateRecord, QueueEntry};
use bilt_storage::{Ack, Key, Queue, QueueError, StorageError, Store};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::event_bus::EventBus;
use crate::runner::{JobRunner, RunContext};

const JOB_PREFIX: &str = "job";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

fn jobs_prefix() -> Key {
    Key::new().push(JOB_PREFIX)
}

/// Key of a job's state record.
pub fn job_key(id: &JobId) -> Key {
    jobs_prefix().push(id.as_str())
}

/// Cloneable handle for dispatching and inspecting jobs.
#[derive(Clone)]
pub struct DispatchHandle {
    kv: Arc<Store>,
    queue: Arc<Queue>,
    events: EventBus,
}

impl DispatchHandle {
    /// Persist `job`, then queue it. Returns the job as stored.
    ///
    /// There is no de-duplication: dispatching an id that is already
    /// recorded overwrites the record and queues a second entry.
    pub fn dispatch_job(&self, job: Job, awakened_from: Option<JobId>) -> Result<Job, DispatchError> {
        let job = job.normalized();
        let record = JobStateRecord { job, awakened_from };
        self.kv.set(&job_key(&record.job.id), &record)?;
        let seq = self.queue.push(&QueueEntry::from(record.clone()))?;

        tracing::info!(
            job_id = %record.job.id,
            kind = %record.job.kind,
            awakened_from = ?record.awakened_from,
            seq,
            "job dispatched"
        );
        self.events.publish(Event::JobDispatched {
            job: record.job.clone(),
            awakened_from: record.awakened_from,
        });
        Ok(record.job)
    }

    /// Whether any job was dispatched and never ended.
    pub fn has_aborted_jobs(&self) -> Result<bool, DispatchError> {
        Ok(self.kv.has_prefix(&jobs_prefix()))
    }

    /// State records of every job dispatched and not yet ended.
    pub fn aborted_jobs(&self) -> Result<Vec<JobStateRecord>, DispatchError> {
        let records = self.kv.scan_prefix::<JobStateRecord>(&jobs_prefix())?;
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    /// Dispatch every recorded job again, keeping its `awakened_from`.
    ///
    /// Records are left in place, so repeated crashes replay the same jobs
    /// until one of them actually ends.
    pub fn rerun_aborted_jobs(&self) -> Result<Vec<Job>, DispatchError> {
        let records = self.aborted_jobs()?;
        if !records.is_empty() {
            tracing::info!(count = records.len(), "re-dispatching aborted jobs");
        }
        records.into_iter().map(|r| self.dispatch_job(r.job, r.awakened_from)).collect()
    }

    /// Queue entries not yet handed to a runner.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Owns the workspace's stores and the loops working on them.
///
/// Storage is opened by [`Dispatcher::open`] and released when the
/// dispatcher is dropped. Background work starts with [`Dispatcher::start`]
/// and ends with [`Dispatcher::shutdown`].
pub struct Dispatcher {
    handle: DispatchHandle,
    runner: Arc<dyn JobRunner>,
    /// END_JOB subscription, taken by the cleanup task on start
    end_jobs: Option<mpsc::UnboundedReceiver<Event>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Open the queue and key-value stores under `config`'s state directory.
    pub fn open(config: &Config, runner: Arc<dyn JobRunner>) -> Result<Self, DispatchError> {
        let options = config.store_options();
        let kv = Arc::new(Store::open_with(&config.kv_dir, options)?);
        let queue = Arc::new(Queue::open(Arc::new(Store::open_with(&config.queue_dir, options)?))?);
        Ok(Self::with_stores(kv, queue, EventBus::new(), runner))
    }

    pub fn with_stores(kv: Arc<Store>, queue: Arc<Queue>, events: EventBus, runner: Arc<dyn JobRunner>) -> Self {
        // Subscribe now so END_JOB events published before start are kept
        let end_jobs = Some(events.subscribe());
        Self {
            handle: DispatchHandle { kv, queue, events },
            runner,
            end_jobs,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.handle.events
    }

    pub fn kv(&self) -> &Arc<Store> {
        &self.handle.kv
    }

    pub fn dispatch_job(&self, job: Job, awakened_from: Option<JobId>) -> Result<Job, DispatchError> {
        self.handle.dispatch_job(job, awakened_from)
    }

    pub fn has_aborted_jobs(&self) -> Result<bool, DispatchError> {
        self.handle.has_aborted_jobs()
    }

    pub fn aborted_jobs(&self) -> Result<Vec<JobStateRecord>, DispatchError> {
        self.handle.aborted_jobs()
    }

    pub fn rerun_aborted_jobs(&self) -> Result<Vec<Job>, DispatchError> {
        self.handle.rerun_aborted_jobs()
    }

    /// Spawn the execution loop and the END_JOB cleanup task.
    pub fn start(&mut self) {
        let Some(end_jobs) = self.end_jobs.take() else {
            tracing::warn!("dispatcher already started");
            return;
        };
        self.tasks.push(tokio::spawn(cleanup_loop(
            Arc::clone(&self.handle.kv),
            Arc::clone(&self.runner),
            end_jobs,
            self.cancel.clone(),
        )));
        self.tasks.push(tokio::spawn(execution_loop(
            self.handle.clone(),
            Arc::clone(&self.runner),
            self.cancel.clone(),
        )));
        tracing::debug!("dispatcher started");
    }

    /// Process END_JOB events published before [`Dispatcher::start`].
    ///
    /// Lets a caller end jobs without running the queue. Returns the number
    /// of jobs ended; always 0 once started.
    pub async fn apply_pending_events(&mut self) -> usize {
        let Some(end_jobs) = self.end_jobs.as_mut() else {
            return 0;
        };
        let mut ended = 0;
        while let Ok(event) = end_jobs.try_recv() {
            if let Event::EndJob { job, .. } = event {
                end_job(&self.handle.kv, self.runner.as_ref(), &job).await;
                ended += 1;
            }
        }
        ended
    }

    /// Stop both loops and wait for them. Running jobs are not awaited.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "dispatcher task panicked");
            }
        }
        tracing::debug!("dispatcher stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn execution_loop(handle: DispatchHandle, runner: Arc<dyn JobRunner>, cancel: CancellationToken) {
    let queue = Arc::clone(&handle.queue);
    let result = queue
        .listen(
            |entry: QueueEntry, ack: Ack| {
                let handle = handle.clone();
                let runner = Arc::clone(&runner);
                async move {
                    // Its END_JOB was already processed: a duplicate entry
                    if !handle.kv.contains(&job_key(&entry.job.id)) {
                        tracing::debug!(job_id = %entry.job.id, "skipping entry for ended job");
                        return ack.ack();
                    }
                    spawn_job(handle, runner, entry);
                    ack.ack()
                }
            },
            cancel,
        )
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "execution loop stopped");
    }
}

fn spawn_job(handle: DispatchHandle, runner: Arc<dyn JobRunner>, entry: QueueEntry) {
    let QueueEntry { job, awakened_from } = entry;
    let ctx = RunContext {
        awakened_from,
        kv: Arc::clone(&handle.kv),
        events: handle.events.clone(),
        dispatch: handle,
    };
    tokio::spawn(async move {
        let job_id = job.id.clone();
        tracing::info!(job_id = %job_id, kind = %job.kind, "running job");
        if let Err(e) = runner.run(job, ctx).await {
            tracing::warn!(job_id = %job_id, error = %e, "job runner failed");
        }
    });
}

async fn cleanup_loop(
    kv: Arc<Store>,
    runner: Arc<dyn JobRunner>,
    mut events: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(Event::EndJob { job, outcome }) => {
                    tracing::debug!(job_id = %job.id, %outcome, "end of job");
                    end_job(&kv, runner.as_ref(), &job).await;
                }
                Some(_) => {}
                None => return,
            },
            _ = cancel.cancelled() => return,
        }
    }
}

/// Forget a finished job: drop its record, then let its runner clean up.
async fn end_job(kv: &Store, runner: &dyn JobRunner, job: &Job) {
    if let Err(e) = kv.delete(&job_key(&job.id)) {
        tracing::error!(job_id = %job.id, error = %e, "failed to remove job state");
        return;
    }
    if let Err(e) = runner.delete_job_state(job, kv).await {
        tracing::warn!(job_id = %job.id, error = %e, "job state cleanup hook failed");
    }
    tracing::info!(job_id = %job.id, kind = %job.kind, "job ended");
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

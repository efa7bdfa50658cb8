// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build jobs and the records that carry them through the queue.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a dispatched job.
    ///
    /// The same ID names the job's state record, its queue entries and the
    /// END_JOB event that retires it.
    pub struct JobId("job-");
}

/// An opaque unit of build work.
///
/// `kind` selects the runner (install, build, test, publish or a plugin
/// step); `params` is whatever that runner needs and is never inspected
/// by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Job {
    /// Create a job with a freshly generated ID.
    pub fn new(kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self::with_id(JobId::new(), kind, params)
    }

    pub fn with_id(id: impl Into<JobId>, kind: impl Into<String>, params: serde_json::Value) -> Self {
        Self { id: id.into(), kind: kind.into(), params }
    }

    /// Canonical form stored at dispatch: missing params become an empty object.
    pub fn normalized(mut self) -> Self {
        if self.params.is_null() {
            self.params = serde_json::Value::Object(serde_json::Map::new());
        }
        self
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = JobId::new(),
            kind: String = "build",
        }
        set {
            params: serde_json::Value = serde_json::json!({}),
        }
    }
}

/// One item of the durable job queue.
///
/// `awakened_from` names the job whose completion caused this one to be
/// dispatched, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub job: Job,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awakened_from: Option<JobId>,
}

/// Persisted proof that a job was dispatched and has not ended yet.
///
/// Written before the job is enqueued and removed only when its END_JOB
/// event is processed; whatever is left at startup is an aborted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStateRecord {
    pub job: Job,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awakened_from: Option<JobId>,
}

impl From<JobStateRecord> for QueueEntry {
    fn from(record: JobStateRecord) -> Self {
        Self { job: record.job, awakened_from: record.awakened_from }
    }
}

impl From<&QueueEntry> for JobStateRecord {
    fn from(entry: &QueueEntry) -> Self {
        Self { job: entry.job.clone(), awakened_from: entry.awakened_from.clone() }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

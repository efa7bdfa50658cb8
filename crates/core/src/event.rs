// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events published on the dispatcher's event bus.

use crate::job::{Job, JobId};
use serde::{Deserialize, Serialize};

/// How a job ended. Failures end a job just like successes do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    #[default]
    Succeeded,
    Failed {
        error: String,
    },
}

crate::simple_display! {
    JobOutcome {
        Succeeded => "succeeded",
        Failed { .. } => "failed",
    }
}

/// Events that flow between the dispatcher, job runners and the orchestrator.
///
/// Serializes with `{"type": "job:end", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A job was persisted and enqueued.
    #[serde(rename = "job:dispatched")]
    JobDispatched {
        job: Job,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        awakened_from: Option<JobId>,
    },

    /// A job reached the end of its life. Triggers state cleanup.
    #[serde(rename = "job:end")]
    EndJob {
        job: Job,
        #[serde(default)]
        outcome: JobOutcome,
    },

    /// Any other named event a runner or plugin wants to broadcast.
    #[serde(rename = "custom")]
    Custom {
        name: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::JobDispatched { .. } => "job:dispatched",
            Event::EndJob { .. } => "job:end",
            Event::Custom { name, .. } => name,
        }
    }

    /// The job this event is about, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobDispatched { job, .. } | Event::EndJob { job, .. } => Some(&job.id),
            Event::Custom { .. } => None,
        }
    }

    /// One-line description for logs.
    pub fn log_summary(&self) -> String {
        match self {
            Event::JobDispatched { job, awakened_from } => match awakened_from {
                Some(from) => format!("{} id={} kind={} from={}", self.name(), job.id, job.kind, from),
                None => format!("{} id={} kind={}", self.name(), job.id, job.kind),
            },
            Event::EndJob { job, outcome } => {
                format!("{} id={} kind={} outcome={}", self.name(), job.id, job.kind, outcome)
            }
            Event::Custom { name, .. } => format!("custom name={name}"),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

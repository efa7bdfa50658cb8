// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bilt_core::{Job, JobId};

fn record(id: &str, kind: &str, from: Option<&str>) -> JobStateRecord {
    JobStateRecord {
        job: Job::with_id(id, kind, serde_json::json!({})),
        awakened_from: from.map(JobId::from),
    }
}

#[test]
fn records_render_as_table() {
    let records = vec![record("job-a", "build", None), record("job-b", "test", Some("job-a"))];

    assert_eq!(
        render_records(&records),
        "ID     TYPE   AWAKENED FROM\n\
         job-a  build  -\n\
         job-b  test   job-a"
    );
}

#[tokio::test]
async fn clear_ends_outstanding_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_root(dir.path());
    {
        let dispatcher = Dispatcher::open(&config, Arc::new(RunnerRegistry::new())).unwrap();
        dispatcher.dispatch_job(Job::new("build", serde_json::json!({})), None).unwrap();
        dispatcher.dispatch_job(Job::new("test", serde_json::json!({})), None).unwrap();
    }

    let args = JobsArgs { command: Some(JobsCommand::Clear) };
    handle(args, &config, OutputFormat::Json).await.unwrap();

    let dispatcher = Dispatcher::open(&config, Arc::new(RunnerRegistry::new())).unwrap();
    assert!(!dispatcher.has_aborted_jobs().unwrap());
}

#[tokio::test]
async fn listing_leaves_jobs_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::for_root(dir.path());
    {
        let dispatcher = Dispatcher::open(&config, Arc::new(RunnerRegistry::new())).unwrap();
        dispatcher.dispatch_job(Job::new("build", serde_json::json!({})), None).unwrap();
    }

    handle(JobsArgs::default(), &config, OutputFormat::Text).await.unwrap();

    let dispatcher = Dispatcher::open(&config, Arc::new(RunnerRegistry::new())).unwrap();
    assert_eq!(dispatcher.aborted_jobs().unwrap().len(), 1);
}

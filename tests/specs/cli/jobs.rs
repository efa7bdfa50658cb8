//! `bilt jobs` specs

use crate::prelude::*;

#[test]
fn fresh_workspace_has_no_aborted_jobs() {
    let temp = Project::empty();
    temp.bilt().args(&["jobs"]).passes().stdout_has("No aborted jobs");
}

#[test]
fn jobs_as_json_is_an_empty_list() {
    let temp = Project::empty();
    let run = temp.bilt().args(&["-o", "json", "jobs"]).passes();
    assert_eq!(run.stdout_json(), serde_json::json!([]));
}

#[test]
fn clear_on_empty_workspace() {
    let temp = Project::empty();
    temp.bilt().args(&["jobs", "clear"]).passes().stdout_eq("Cleared 0 jobs\n");
}

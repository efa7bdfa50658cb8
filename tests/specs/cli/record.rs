//! `bilt record` specs

use crate::prelude::*;

#[test]
fn record_writes_build_info() {
    let temp = Project::empty();
    temp.bilt().args(&["record"]).passes().stdout_has("Recorded build");

    let info: serde_json::Value = serde_json::from_str(&temp.read(".bilt/last-build.json")).unwrap();
    assert!(info["commit"].is_null());
    assert_eq!(info["changedFilesInWorkspace"], serde_json::json!({}));
}

#[test]
fn record_captures_head_and_dirty_files() {
    let temp = Project::empty();
    if !temp.git_init() {
        return;
    }
    temp.file("a.txt", "one\n");
    temp.commit_all("init");
    temp.file("b.txt", "dirty\n");

    let run = temp.bilt().args(&["-o", "json", "record"]).passes();
    let info = run.stdout_json();
    assert_eq!(info["commit"].as_str().map(str::len), Some(40));
    let dirty = info["changedFilesInWorkspace"].as_object().unwrap();
    assert_eq!(dirty.keys().collect::<Vec<_>>(), vec!["b.txt"]);
}

#[test]
fn state_dir_override_moves_build_info() {
    let temp = Project::empty();
    temp.bilt().env("BILT_STATE_DIR", "state").args(&["record"]).passes();

    assert!(temp.path().join("state/last-build.json").exists());
    assert!(!temp.path().join(".bilt/last-build.json").exists());
}

#[test]
fn invalid_config_fails() {
    let temp = Project::empty();
    temp.file(".bilt/config.toml", "unknown_key = 1\n");
    temp.bilt().args(&["record"]).exits(1).stderr_has("config.toml");
}

#[test]
fn relocated_state_dir_is_not_reported_as_changed() {
    let temp = Project::empty();
    if !temp.git_init() {
        return;
    }
    temp.file("a.txt", "one\n");
    temp.commit_all("init");

    temp.bilt().env("BILT_STATE_DIR", "state").args(&["record"]).passes();
    temp.bilt().env("BILT_STATE_DIR", "state").args(&["jobs"]).passes();
    temp.bilt().env("BILT_STATE_DIR", "state").args(&["changed", "--exit-code"]).passes().stdout_eq("");
}

//! `bilt changed` specs

use crate::prelude::*;

#[test]
fn no_prior_build_means_everything_changed() {
    let temp = Project::empty();
    temp.bilt().args(&["changed"]).passes().stdout_eq("everything\n");
}

#[test]
fn no_prior_build_as_json() {
    let temp = Project::empty();
    let run = temp.bilt().args(&["-o", "json", "changed"]).passes();
    assert_eq!(run.stdout_json(), serde_json::json!({ "everything": true }));
}

#[test]
fn exit_code_flag_signals_changes() {
    let temp = Project::empty();
    temp.bilt().args(&["changed", "--exit-code"]).exits(1).stdout_eq("everything\n");
}

#[test]
fn malformed_build_info_means_everything_changed() {
    let temp = Project::empty();
    temp.file(".bilt/last-build.json", "{not json");
    temp.bilt().args(&["changed"]).passes().stdout_eq("everything\n");
}

#[test]
fn nothing_changed_right_after_record() {
    let temp = Project::empty();
    temp.file("src/main.rs", "fn main() {}\n");
    temp.bilt().args(&["record"]).passes();
    temp.bilt().args(&["changed", "--exit-code"]).passes().stdout_eq("");
}

#[test]
fn workspace_edits_show_up() {
    let temp = Project::empty();
    if !temp.git_init() {
        return;
    }
    temp.file("a.txt", "one\n");
    temp.file(".biltignore", "*.log\n");
    temp.commit_all("init");
    temp.bilt().args(&["record"]).passes();

    temp.file("a.txt", "two\n");
    temp.file("b.txt", "new\n");
    temp.file("debug.log", "noise\n");

    temp.bilt()
        .args(&["changed"])
        .passes()
        .stdout_has("a.txt")
        .stdout_has("b.txt")
        .stdout_lacks("debug.log")
        .stdout_lacks(".bilt/");
}

#[test]
fn committed_changes_show_up() {
    let temp = Project::empty();
    if !temp.git_init() {
        return;
    }
    temp.file("a.txt", "one\n");
    temp.file("b.txt", "one\n");
    temp.commit_all("init");
    temp.bilt().args(&["record"]).passes();

    temp.file("a.txt", "two\n");
    temp.commit_all("edit a");

    let run = temp.bilt().args(&["-o", "json", "changed"]).passes();
    assert_eq!(run.stdout_json(), serde_json::json!({ "everything": false, "files": ["a.txt"] }));
}

#[test]
fn reverting_an_edit_after_record_is_a_change() {
    let temp = Project::empty();
    if !temp.git_init() {
        return;
    }
    temp.file("a.txt", "one\n");
    temp.commit_all("init");
    temp.file("a.txt", "dirty\n");
    temp.bilt().args(&["record"]).passes();

    temp.git(&["checkout", "--", "a.txt"]);

    temp.bilt().args(&["changed"]).passes().stdout_eq("a.txt\n");
}

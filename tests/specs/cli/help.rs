//! CLI help output specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    cli().args(&["--help"]).passes().stdout_has("Usage:").stdout_has("changed").stdout_has("record").stdout_has("jobs");
}

#[test]
fn no_args_shows_usage_and_fails() {
    cli().exits(2).stderr_has("Usage:");
}

#[test]
fn changed_help_shows_exit_code_flag() {
    cli().args(&["changed", "--help"]).passes().stdout_has("--exit-code");
}

#[test]
fn jobs_help_shows_clear() {
    cli().args(&["jobs", "--help"]).passes().stdout_has("clear");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}

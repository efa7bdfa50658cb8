// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{format_or_json, render_table, OutputFormat};

#[test]
fn table_aligns_columns() {
    let rows = vec![
        vec!["job-1".to_string(), "build".to_string(), "-".to_string()],
        vec!["job-22".to_string(), "test".to_string(), "job-1".to_string()],
    ];
    let table = render_table(&["ID", "TYPE", "AWAKENED FROM"], &rows);

    assert_eq!(
        table,
        "ID      TYPE   AWAKENED FROM\n\
         job-1   build  -\n\
         job-22  test   job-1"
    );
}

#[test]
fn table_with_no_rows_is_header_only() {
    assert_eq!(render_table(&["A", "B"], &[]), "A  B");
}

#[test]
fn format_or_json_runs_text_fn_for_text() {
    let mut called = false;
    format_or_json(OutputFormat::Text, &serde_json::json!({}), || called = true).unwrap();
    assert!(called);
}

#[test]
fn format_or_json_skips_text_fn_for_json() {
    let mut called = false;
    format_or_json(OutputFormat::Json, &serde_json::json!({ "a": 1 }), || called = true).unwrap();
    assert!(!called);
}

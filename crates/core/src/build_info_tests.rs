// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;

#[test]
fn json_layout_is_camel_case() {
    let mut files = IndexMap::new();
    files.insert(PathBuf::from("packages/a/index.js"), "abc".to_string());
    let info = RepoBuildInfo::new(Some("deadbeef".to_string()), files);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "commit": "deadbeef",
            "changedFilesInWorkspace": { "packages/a/index.js": "abc" }
        })
    );
}

#[test]
fn missing_fields_default() {
    let info: RepoBuildInfo = serde_json::from_str("{}").unwrap();
    assert_eq!(info, RepoBuildInfo::default());
}

#[test]
fn keeps_insertion_order() {
    let json = r#"{"commit":null,"changedFilesInWorkspace":{"z":"1","a":"2","m":"3"}}"#;
    let info: RepoBuildInfo = serde_json::from_str(json).unwrap();
    let keys: Vec<_> = info.changed_files_in_workspace.keys().cloned().collect();
    assert_eq!(keys, vec![PathBuf::from("z"), PathBuf::from("a"), PathBuf::from("m")]);
}

#[test]
fn same_commit_compares_revisions() {
    let a = RepoBuildInfo::new(Some("1".into()), IndexMap::new());
    let b = RepoBuildInfo::new(Some("1".into()), IndexMap::new());
    let c = RepoBuildInfo::new(None, IndexMap::new());
    assert!(a.same_commit(&b));
    assert!(!a.same_commit(&c));
}

#[test]
fn is_deleted_checks_sentinel() {
    let mut files = IndexMap::new();
    files.insert(PathBuf::from("gone.txt"), DELETED_HASH.to_string());
    files.insert(PathBuf::from("here.txt"), "h".to_string());
    let info = RepoBuildInfo::new(None, files);
    assert!(info.is_deleted(Path::new("gone.txt")));
    assert!(!info.is_deleted(Path::new("here.txt")));
    assert!(!info.is_deleted(Path::new("other.txt")));
}

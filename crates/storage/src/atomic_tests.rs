// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn writes_and_replaces() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    write_atomic(&path, b"one").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "one");

    write_atomic(&path, b"two").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "two");
}

#[test]
fn creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/deep/state.json");
    write_atomic(&path, b"x").unwrap();
    assert!(path.exists());
}

#[test]
fn leaves_no_temp_files_behind() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    write_atomic(&path, b"payload").unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["state.json"]);
}

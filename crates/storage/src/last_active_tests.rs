// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = LastActiveStore::new(dir.path().join("last-active.json"));

    let state = LastActiveState {
        destination: Some(Destination::new("tg1", "u1")),
        updated_at: Utc::now(),
    };
    store.save(&state).unwrap();
    assert_eq!(store.load(), Some(state));
}

#[test]
fn missing_file_is_none() {
    let dir = TempDir::new().unwrap();
    let store = LastActiveStore::new(dir.path().join("last-active.json"));
    assert!(store.load().is_none());
}

#[test]
fn malformed_file_is_none() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("last-active.json");
    fs::write(&path, "[oops").unwrap();
    assert!(LastActiveStore::new(&path).load().is_none());
}

#[test]
fn save_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let store = LastActiveStore::new(dir.path().join("state/last-active.json"));
    store
        .save(&LastActiveState {
            destination: None,
            updated_at: Utc::now(),
        })
        .unwrap();
    assert!(dir.path().join("state/last-active.json").exists());
}

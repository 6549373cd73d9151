use std::fs;

use ideaboard_engine::{key_filename, FileStore, LocalStore, MemoryStore, StoreError};
use tempfile::TempDir;

#[test]
fn open_creates_missing_store_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("nested").join("store");
    assert!(!new_dir.exists());
    let store = FileStore::open(&new_dir).unwrap();
    assert!(new_dir.is_dir());
    assert_eq!(store.dir(), new_dir.as_path());
}

#[test]
fn open_rejects_a_file_path() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let err = FileStore::open(&file_path).unwrap_err();
    assert!(matches!(err, StoreError::StoreDir { .. }));
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "x");
}

#[test]
fn set_replaces_the_value_and_leaves_no_staging_files() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::open(temp.path()).unwrap();

    store.set("idea_result_job-42", "hello").unwrap();
    store.set("idea_result_job-42", "world").unwrap();

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![key_filename("idea_result_job-42")]);
    assert_eq!(
        fs::read_to_string(temp.path().join(key_filename("idea_result_job-42"))).unwrap(),
        "world"
    );
}

#[test]
fn set_fails_once_the_directory_is_gone() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("store");
    let store = FileStore::open(&dir).unwrap();
    fs::remove_dir(&dir).unwrap();

    assert!(store.set("auth_token", "tok").is_err());
    assert_eq!(store.get("auth_token").unwrap(), None);
}

#[test]
fn file_store_round_trips_and_removes() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::open(temp.path().join("store")).unwrap();

    assert_eq!(store.get("idea_result_job-42").unwrap(), None);
    store.set("idea_result_job-42", r#"{"persona":[]}"#).unwrap();
    store.set("idea_result_job-42", r#"{"persona":[{"name":"A"}]}"#).unwrap();
    assert_eq!(
        store.get("idea_result_job-42").unwrap().as_deref(),
        Some(r#"{"persona":[{"name":"A"}]}"#)
    );

    store.remove("idea_result_job-42").unwrap();
    assert_eq!(store.get("idea_result_job-42").unwrap(), None);
    // Removing a missing key is not an error.
    store.remove("idea_result_job-42").unwrap();
}

#[test]
fn hostile_keys_stay_inside_the_store() {
    let name = key_filename("../../etc/passwd");
    assert!(!name.contains('/'));
    assert!(!name.starts_with('.'));

    // Keys that sanitize identically still map to different files.
    assert_ne!(key_filename("a/b"), key_filename("a?b"));
}

#[test]
fn memory_store_behaves_like_a_map() {
    let store = MemoryStore::new();
    store.set("auth_token", "tok").unwrap();
    assert_eq!(store.get("auth_token").unwrap().as_deref(), Some("tok"));
    store.remove("auth_token").unwrap();
    assert_eq!(store.get("auth_token").unwrap(), None);
}

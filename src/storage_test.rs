use super::*;

// =============================================================================
// MemoryStorage
// =============================================================================

#[test]
fn memory_set_get_remove() {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get_item("jwt_access_token").unwrap(), None);

    storage.set_item("jwt_access_token", "AT1").unwrap();
    assert_eq!(storage.get_item("jwt_access_token").unwrap().as_deref(), Some("AT1"));
    assert_eq!(storage.len(), 1);

    storage.remove_item("jwt_access_token").unwrap();
    assert!(storage.is_empty());
}

#[test]
fn memory_remove_missing_is_ok() {
    let storage = MemoryStorage::new();
    assert!(storage.remove_item("user").is_ok());
}

// =============================================================================
// FileStorage
// =============================================================================

#[test]
fn file_missing_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("session.json"));
    assert_eq!(storage.get_item("jwt_refresh_token").unwrap(), None);
}

#[test]
fn file_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let first = FileStorage::new(&path);
    first.set_item("jwt_access_token", "AT1").unwrap();
    first.set_item("jwt_refresh_token", "RT1").unwrap();

    let second = FileStorage::new(&path);
    assert_eq!(second.get_item("jwt_access_token").unwrap().as_deref(), Some("AT1"));
    assert_eq!(second.get_item("jwt_refresh_token").unwrap().as_deref(), Some("RT1"));

    second.remove_item("jwt_access_token").unwrap();
    assert_eq!(first.get_item("jwt_access_token").unwrap(), None);
    assert_eq!(first.get_item("jwt_refresh_token").unwrap().as_deref(), Some("RT1"));
}

#[test]
fn file_corrupt_contents_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json").unwrap();

    let storage = FileStorage::new(&path);
    let err = storage.get_item("user").unwrap_err();
    assert!(matches!(err, GatewayError::Storage(_)));
}

#[test]
fn file_blank_contents_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "  \n").unwrap();

    let storage = FileStorage::new(&path);
    assert_eq!(storage.get_item("user").unwrap(), None);
}

#[test]
fn file_corrupt_contents_are_replaced_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json").unwrap();

    let storage = FileStorage::new(&path);
    storage.set_item("jwt_access_token", "AT1").unwrap();

    assert_eq!(storage.get_item("jwt_access_token").unwrap().as_deref(), Some("AT1"));
    let on_disk: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, serde_json::json!({ "jwt_access_token": "AT1" }));
}

#[test]
fn file_corrupt_contents_can_be_removed_from() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json").unwrap();

    let storage = FileStorage::new(&path);
    storage.remove_item("user").unwrap();

    assert_eq!(storage.get_item("user").unwrap(), None);
}

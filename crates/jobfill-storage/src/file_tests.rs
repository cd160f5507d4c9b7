use super::*;
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_open_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = JsonFileStore::open(temp_dir.path().join("nested/store.json"))
        .await
        .unwrap();
    assert!(store.keys().await.unwrap().is_empty());
    assert!(temp_dir.path().join("nested").is_dir());
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");

    {
        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("accessToken", json!("tok-1")).await.unwrap();
        store
            .set("fieldFingerprintCache", json!({"fp": {"cached_at": 1}}))
            .await
            .unwrap();
    }

    let reopened = JsonFileStore::open(&path).await.unwrap();
    assert_eq!(reopened.get("accessToken").await.unwrap(), Some(json!("tok-1")));
    assert_eq!(
        reopened.get("fieldFingerprintCache").await.unwrap(),
        Some(json!({"fp": {"cached_at": 1}}))
    );
    assert!(!temp_dir.path().join("store.json.tmp").exists());
}

#[tokio::test]
async fn test_remove_persists() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");

    let store = JsonFileStore::open(&path).await.unwrap();
    store.set("a", json!(1)).await.unwrap();
    store.set("b", json!(2)).await.unwrap();
    store.remove("a").await.unwrap();

    let reopened = JsonFileStore::open(&path).await.unwrap();
    assert_eq!(reopened.keys().await.unwrap(), vec!["b".to_string()]);
}

#[tokio::test]
async fn test_corrupted_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = JsonFileStore::open(&path).await;
    assert!(matches!(result, Err(StorageError::Corrupted { .. })));
}

#[tokio::test]
async fn test_non_object_document() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let err = JsonFileStore::open(&path).await.err().unwrap();
    assert!(err.to_string().contains("an array"));
}

#[tokio::test]
async fn test_empty_file_is_empty_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");
    std::fs::write(&path, "   \n").unwrap();

    let store = JsonFileStore::open(&path).await.unwrap();
    assert!(store.get("anything").await.unwrap().is_none());
    assert_eq!(store.path(), path.as_path());
}

#[tokio::test]
async fn test_failed_write_leaves_memory_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");

    let store = JsonFileStore::open(&path).await.unwrap();
    store.set("a", json!(1)).await.unwrap();

    // A directory where the temporary file goes makes every write fail.
    std::fs::create_dir(temp_dir.path().join("store.json.tmp")).unwrap();

    assert!(store.set("a", json!(2)).await.is_err());
    assert!(store.set("b", json!(3)).await.is_err());
    assert!(store.remove("a").await.is_err());

    assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
    assert_eq!(store.get("b").await.unwrap(), None);
    assert_eq!(store.keys().await.unwrap(), vec!["a".to_string()]);
}

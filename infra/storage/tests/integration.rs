use basis_storage::*;
use tempfile::TempDir;

async fn open(temp: &TempDir) -> Storage {
    Storage::builder().root(temp.path()).connect().await.unwrap()
}

#[tokio::test]
async fn test_path_traversal_blocked() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    assert!(matches!(storage.resolve("../etc/passwd"), Err(StorageError::InvalidPath { .. })));
    assert!(matches!(storage.resolve("foo/../../bar"), Err(StorageError::InvalidPath { .. })));
    assert!(matches!(storage.resolve("/etc/passwd"), Err(StorageError::InvalidPath { .. })));
}

#[tokio::test]
async fn test_write_read_roundtrip_uncompressed() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.write("models/config.archive", b"hello world").await.unwrap();
    assert!(storage.exists("models/config.archive").unwrap());
    assert_eq!(storage.read("models/config.archive").await.unwrap(), b"hello world");
}

#[tokio::test]
async fn test_write_read_roundtrip_compressed() {
    let temp = TempDir::new().unwrap();
    let storage =
        Storage::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let payload = vec![7u8; 4096];
    storage.write("bulk.archive", &payload).await.unwrap();

    let on_disk = std::fs::read(temp.path().join("bulk.archive")).unwrap();
    assert!(on_disk.len() < payload.len(), "payload should be stored compressed");
    assert_eq!(storage.read("bulk.archive").await.unwrap(), payload);
}

#[tokio::test]
async fn test_atomic_write_replaces_and_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.write("user/1.archive", b"first").await.unwrap();
    storage.write("user/1.archive", b"second").await.unwrap();

    assert_eq!(storage.read("user/1.archive").await.unwrap(), b"second");
    let leftovers = std::fs::read_dir(temp.path().join("user"))
        .unwrap()
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().contains(".basistmp."))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_direct_write_truncates_previous_content() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.write_direct("plain.archive", b"a much longer first payload").await.unwrap();
    storage.write_direct("plain.archive", b"short").await.unwrap();

    assert_eq!(storage.read("plain.archive").await.unwrap(), b"short");
}

#[tokio::test]
async fn test_delete_and_exists() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    storage.write("tmp/file.txt", b"x").await.unwrap();
    assert!(storage.exists("tmp/file.txt").unwrap());

    storage.delete("tmp/file.txt").await.unwrap();
    assert!(!storage.exists("tmp/file.txt").unwrap());
    assert!(storage.delete("tmp/file.txt").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_read_missing_returns_file_not_found() {
    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;

    let err = storage.read("missing.bin").await.expect_err("expected error");
    assert!(err.is_not_found(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_corrupted_compressed_file_reports_decompress_error() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("broken.archive"), [8, 0, 0, 0, 0xff]).unwrap();
    let storage =
        Storage::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let err = storage.read("broken.archive").await.expect_err("expected error");
    assert!(matches!(err, StorageError::Decompress { .. }), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_connect_without_create_requires_existing_root() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent");

    let err = Storage::builder().root(&missing).create(false).connect().await.unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
    assert!(!missing.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_write_failure_is_reported() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let storage = open(&temp).await;
    std::fs::create_dir(temp.path().join("locked")).unwrap();
    std::fs::set_permissions(temp.path().join("locked"), std::fs::Permissions::from_mode(0o500))
        .unwrap();

    // Root bypasses permission bits; nothing to assert in that environment.
    if std::fs::write(temp.path().join("locked/probe"), b"").is_ok() {
        return;
    }

    let err = storage.write("locked/model.archive", b"data").await.unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }), "unexpected error: {err:?}");
}

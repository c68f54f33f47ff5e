use crate::s3::error::StorageError;
use crate::s3::{FakeObjectStorage, ObjectStorage};

#[tokio::test]
async fn exists_reports_absence_as_ok_false() {
    let storage = FakeObjectStorage::new();

    // Not-yet-present output is the normal case, not an error.
    assert!(!storage.exists("b", "tmp/u1/p1/out/in.mp4").await.unwrap());

    storage.fake_add_object("b", "tmp/u1/p1/out/in.mp4");
    assert!(storage.exists("b", "tmp/u1/p1/out/in.mp4").await.unwrap());

    storage.fake_remove_object("b", "tmp/u1/p1/out/in.mp4");
    assert!(!storage.exists("b", "tmp/u1/p1/out/in.mp4").await.unwrap());
}

#[tokio::test]
async fn exists_distinguishes_buckets() {
    let storage = FakeObjectStorage::new();
    storage.fake_add_object("bucket-a", "key");

    assert!(storage.exists("bucket-a", "key").await.unwrap());
    assert!(!storage.exists("bucket-b", "key").await.unwrap());
}

#[tokio::test]
async fn probe_failures_surface_as_errors() {
    let storage = FakeObjectStorage::new();
    storage.fake_add_object("b", "key");
    storage.fake_fail_probe("b", "key");

    let result = storage.exists("b", "key").await;
    assert!(matches!(result, Err(StorageError::ProbeTimeout(_))));

    storage.fake_clear_probe_failure("b", "key");
    assert!(storage.exists("b", "key").await.unwrap());
}

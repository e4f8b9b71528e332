// Tests for engine setup, single-key operations and failure reporting

use std::sync::Arc;

use storemaster::fs::memory::memory_remote;
use storemaster::fs::MemoryBucketAdmin;
use storemaster::sync::{KeyFilter, SyncEngine, SyncOptions, SyncPhase};
use storemaster::{ErrorKind, PathKey};
use tokio::sync::mpsc;

use crate::common::{key, Fixture, BUCKET};

#[tokio::test]
async fn test_open_creates_missing_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let admin = Arc::new(MemoryBucketAdmin::new());
    let remote = memory_remote(BUCKET, admin.clone()).unwrap();

    assert!(!admin.contains(BUCKET).await);
    SyncEngine::open(remote, dir.path(), KeyFilter::default(), SyncOptions::default())
        .await
        .unwrap();
    assert!(admin.contains(BUCKET).await);
}

#[tokio::test]
async fn test_open_surfaces_auth_failure() {
    let dir = tempfile::tempdir().unwrap();
    let admin = Arc::new(MemoryBucketAdmin::failing(ErrorKind::Auth));
    let remote = memory_remote(BUCKET, admin).unwrap();

    let result = SyncEngine::open(remote, dir.path(), KeyFilter::default(), SyncOptions::default()).await;
    assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Auth));
}

#[tokio::test]
async fn test_existing_bucket_is_kept() {
    let fx = Fixture::new().await;
    assert!(fx.admin.contains(BUCKET).await);
}

#[tokio::test]
async fn test_push_one_then_pull_one() {
    let fx = Fixture::new().await;
    fx.write_local("sub/b.txt", b"payload");

    let pushed = fx.engine.push_one(&key("sub/b.txt")).await.unwrap();
    assert_eq!(pushed.bytes, 7);
    assert_eq!(fx.read_remote("sub/b.txt").await, b"payload");

    std::fs::remove_file(fx.root().join("sub/b.txt")).unwrap();
    fx.engine.pull_one(&key("sub/b.txt")).await.unwrap();
    assert_eq!(fx.read_local("sub/b.txt"), b"payload");
}

#[tokio::test]
async fn test_single_key_ops_reject_hidden_keys() {
    let fx = Fixture::new().await;
    fx.write_local(".env", b"secret");
    fx.write_remote(".env", b"secret").await;

    let err = fx.engine.push_one(&key(".env")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Path);

    let err = fx.engine.pull_one(&key("dir/.env")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Path);
}

#[tokio::test]
async fn test_user_path_with_root_prefix() {
    let fx = Fixture::new().await;
    fx.write_local("sub/b.txt", b"b");

    let raw = fx.root().join("sub/b.txt");
    let parsed = PathKey::from_user_path(fx.engine.local_root(), raw.to_str().unwrap()).unwrap();
    fx.engine.push_one(&parsed).await.unwrap();

    assert_eq!(fx.remote_keys().await, vec!["sub/b.txt"]);
}

#[tokio::test]
async fn test_pull_one_missing_object_names_key() {
    let fx = Fixture::new().await;

    let err = fx.engine.pull_one(&key("nope.txt")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.failed_key(), Some("nope.txt"));
}

#[tokio::test]
async fn test_failed_transfer_aborts_with_key() {
    let fx = Fixture::new().await;
    fx.write_local("a.txt", b"a");
    // a local directory named like the remote-only key blocks the download
    fx.write_local("blocked.txt/.keep", b"");
    fx.write_remote("blocked.txt", b"remote").await;

    let err = fx.engine.sync_bidirectional().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Path);
    assert_eq!(err.failed_key(), Some("blocked.txt"));
    // the upload that ran before the failure is kept
    assert!(fx.remote_exists("a.txt").await);
}

#[tokio::test]
async fn test_progress_reports_every_transfer() {
    let fx = Fixture::new().await;
    fx.write_local("a.txt", b"a");
    fx.write_local("b.txt", b"b");

    let (tx, mut rx) = mpsc::channel(64);
    let engine = fx.engine.with_progress(tx);
    engine.sync_bidirectional().await.unwrap();
    drop(engine);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    assert_eq!(updates.first().map(|u| u.phase), Some(SyncPhase::Listing));
    let last = updates.last().unwrap();
    assert_eq!(last.phase, SyncPhase::Done);
    assert_eq!((last.done, last.total), (2, 2));
    assert_eq!(
        updates.iter().filter(|u| u.phase == SyncPhase::Transferring).count(),
        2
    );
}

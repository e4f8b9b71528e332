// Tests for sync_bidirectional

use storemaster::sync::{KeyFilter, SyncMode, SyncOptions};

use crate::common::{names, Fixture};

#[tokio::test]
async fn test_downloads_remote_only_and_deletes_nothing() {
    let fx = Fixture::new().await;
    fx.write_local("a.txt", b"a");
    fx.write_remote("a.txt", b"a").await;
    fx.write_remote("old.txt", b"old").await;

    let report = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(report.mode, SyncMode::Bidirectional);
    assert!(report.uploaded.is_empty());
    assert_eq!(names(&report.downloaded), vec!["old.txt"]);
    assert!(report.deleted.is_empty());
    assert_eq!(fx.read_local("old.txt"), b"old");
    assert_eq!(fx.remote_keys().await, vec!["a.txt", "old.txt"]);
}

#[tokio::test]
async fn test_copies_missing_files_both_ways() {
    let fx = Fixture::new().await;
    fx.write_local("local/only.txt", b"up");
    fx.write_remote("remote/deep/only.txt", b"down").await;

    let report = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(names(&report.uploaded), vec!["local/only.txt"]);
    assert_eq!(names(&report.downloaded), vec!["remote/deep/only.txt"]);
    assert_eq!(report.bytes_transferred, 6);
    assert_eq!(fx.read_local("remote/deep/only.txt"), b"down");
    assert_eq!(fx.read_remote("local/only.txt").await, b"up");
}

#[tokio::test]
async fn test_second_sync_transfers_nothing() {
    let fx = Fixture::new().await;
    fx.write_local("a.txt", b"a");
    fx.write_local("sub/b.txt", b"b");
    fx.write_remote("c.txt", b"c").await;

    fx.engine.sync_bidirectional().await.unwrap();
    let second = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(second.transfers(), 0);
    assert_eq!(second.unchanged, 3);
}

#[tokio::test]
async fn test_common_keys_keep_their_content() {
    let fx = Fixture::new().await;
    fx.write_local("a.txt", b"local version");
    fx.write_remote("a.txt", b"remote version").await;

    let report = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(report.transfers(), 0);
    assert_eq!(fx.read_local("a.txt"), b"local version");
    assert_eq!(fx.read_remote("a.txt").await, b"remote version");
}

#[tokio::test]
async fn test_hidden_keys_never_cross() {
    let fx = Fixture::new().await;
    fx.write_local(".git/config", b"x");
    fx.write_local("sub/.DS_Store", b"x");
    fx.write_remote(".cache/blob", b"y").await;

    let report = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(report.transfers(), 0);
    assert!(!fx.remote_exists(".git/config").await);
    assert!(!fx.root().join(".cache").exists());
}

#[tokio::test]
async fn test_dry_run_reports_plan_only() {
    let options = SyncOptions {
        dry_run: true,
        ..SyncOptions::default()
    };
    let fx = Fixture::with_options(KeyFilter::default(), options).await;
    fx.write_local("up.txt", b"u");
    fx.write_remote("down.txt", b"d").await;

    let report = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(names(&report.uploaded), vec!["up.txt"]);
    assert_eq!(names(&report.downloaded), vec!["down.txt"]);
    assert!(!fx.root().join("down.txt").exists());
    assert!(!fx.remote_exists("up.txt").await);
}

#[tokio::test]
async fn test_single_worker_still_completes() {
    let options = SyncOptions {
        workers: 1,
        ..SyncOptions::default()
    };
    let fx = Fixture::with_options(KeyFilter::default(), options).await;
    for i in 0..20 {
        fx.write_local(&format!("batch/{i:02}.txt"), b"x");
    }

    let report = fx.engine.sync_bidirectional().await.unwrap();

    assert_eq!(report.uploaded.len(), 20);
    // reported keys are sorted whatever the completion order
    assert_eq!(report.uploaded.first().unwrap().as_str(), "batch/00.txt");
    assert_eq!(fx.remote_keys().await.len(), 20);
}

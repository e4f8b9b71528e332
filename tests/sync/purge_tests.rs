// Tests for purge and list

use storemaster::sync::SyncMode;

use crate::common::{names, Fixture};

#[tokio::test]
async fn test_purge_empties_bucket_regardless_of_local_state() {
    let fx = Fixture::new().await;
    fx.write_local("a.txt", b"a");
    fx.write_remote("a.txt", b"a").await;
    fx.write_remote("x/y/z.txt", b"z").await;

    let report = fx.engine.purge().await.unwrap();

    assert_eq!(report.mode, SyncMode::Purge);
    assert_eq!(names(&report.deleted), vec!["a.txt", "x/y/z.txt"]);
    assert!(fx.remote_keys().await.is_empty());
    // local files are untouched
    assert_eq!(fx.read_local("a.txt"), b"a");
}

#[tokio::test]
async fn test_purge_of_empty_bucket() {
    let fx = Fixture::new().await;
    let report = fx.engine.purge().await.unwrap();
    assert_eq!(report.transfers(), 0);
}

#[tokio::test]
async fn test_purge_works_without_local_root() {
    let fx = Fixture::new().await;
    fx.write_remote("a.txt", b"a").await;
    std::fs::remove_dir_all(fx.root()).unwrap();

    fx.engine.purge().await.unwrap();
    assert!(fx.remote_keys().await.is_empty());
}

#[tokio::test]
async fn test_list_is_sorted_and_read_only() {
    let fx = Fixture::new().await;
    fx.write_remote("b.txt", b"b").await;
    fx.write_remote("a/1.txt", b"1").await;
    fx.write_remote(".hidden", b"h").await;

    let first = fx.remote_keys().await;
    let second = fx.remote_keys().await;

    assert_eq!(first, vec!["a/1.txt", "b.txt"]);
    assert_eq!(first, second);
    assert!(fx.root().read_dir().unwrap().next().is_none());
}

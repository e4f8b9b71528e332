use std::fs;
use std::path::Path;
use std::sync::Arc;

use storemaster::fs::memory::memory_remote;
use storemaster::fs::MemoryBucketAdmin;
use storemaster::sync::{KeyFilter, SyncEngine, SyncOptions};
use storemaster::PathKey;
use tempfile::TempDir;

pub const BUCKET: &str = "test-bucket";

pub struct Fixture {
    pub dir: TempDir,
    pub engine: SyncEngine,
    pub admin: Arc<MemoryBucketAdmin>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_options(KeyFilter::default(), SyncOptions::default()).await
    }

    pub async fn with_options(filter: KeyFilter, options: SyncOptions) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let admin = Arc::new(MemoryBucketAdmin::with_bucket(BUCKET));
        let remote = memory_remote(BUCKET, admin.clone()).unwrap();
        let engine = SyncEngine::open(remote, dir.path(), filter, options).await.unwrap();
        Self { dir, engine, admin }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_local(&self, key: &str, content: &[u8]) {
        let path = self.root().join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read_local(&self, key: &str) -> Vec<u8> {
        fs::read(self.root().join(key)).unwrap()
    }

    pub async fn write_remote(&self, key: &str, content: &[u8]) {
        self.engine
            .remote()
            .operator()
            .write(key, content.to_vec())
            .await
            .unwrap();
    }

    pub async fn read_remote(&self, key: &str) -> Vec<u8> {
        self.engine.remote().operator().read(key).await.unwrap().to_vec()
    }

    pub async fn remote_exists(&self, key: &str) -> bool {
        self.engine.remote().operator().exists(key).await.unwrap()
    }

    /// Visible remote keys as sorted strings.
    pub async fn remote_keys(&self) -> Vec<String> {
        names(&self.engine.list().await.unwrap())
    }
}

pub fn key(raw: &str) -> PathKey {
    PathKey::parse(raw).unwrap()
}

pub fn names(keys: &[PathKey]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

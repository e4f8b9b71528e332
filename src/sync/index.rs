//! Remote Index: every key currently stored in the bucket.
//!
//! The listing is paginated by the store; opendal's lister follows the
//! continuation tokens and the retry layer retries each page. A page that
//! still fails ends the stream with an error, and [`RemoteIndex::collect`]
//! returns that error instead of a partial set.

use futures::future;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use opendal::Entry;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::fs::Remote;
use crate::key::{KeySet, PathKey};
use crate::sync::exclude::KeyFilter;

pub struct RemoteIndex;

impl RemoteIndex {
    /// Lazy sequence of visible keys. Each call starts a fresh listing.
    pub async fn stream(remote: &Remote, filter: KeyFilter) -> Result<BoxStream<'static, Result<PathKey>>> {
        let lister = remote
            .operator()
            .lister_with("")
            .recursive(true)
            .await
            .map_err(|e| SyncError::from_opendal(e, "list bucket"))?;

        let keys = lister.filter_map(move |entry| {
            future::ready(match entry {
                Ok(entry) => Self::visible_key(&entry, &filter).map(Ok),
                Err(e) => Some(Err(SyncError::from_opendal(e, "list bucket"))),
            })
        });

        Ok(keys.boxed())
    }

    /// Drain the full listing into a key set.
    pub async fn collect(remote: &Remote, filter: &KeyFilter) -> Result<KeySet> {
        let mut stream = Self::stream(remote, filter.clone()).await?;
        let mut keys = Vec::new();

        while let Some(key) = stream.try_next().await? {
            keys.push(key);
        }

        debug!(bucket = remote.bucket(), count = keys.len(), "listed remote keys");
        Ok(keys.into_iter().collect())
    }

    fn visible_key(entry: &Entry, filter: &KeyFilter) -> Option<PathKey> {
        let raw = entry.path();

        // directory markers are not objects
        if entry.metadata().mode().is_dir() || raw.ends_with('/') {
            return None;
        }

        let key = match PathKey::parse(raw) {
            Ok(key) if key.as_str() == raw => key,
            _ => {
                warn!(key = raw, "remote key has no local equivalent, ignoring");
                return None;
            }
        };

        if filter.allows(&key) {
            Some(key)
        } else {
            debug!(key = raw, "excluded from remote index");
            None
        }
    }
}

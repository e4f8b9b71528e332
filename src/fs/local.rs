use std::io;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::key::{KeySet, PathKey};
use crate::sync::exclude::KeyFilter;

/// Scanner for the local side of the sync.
pub struct LocalTree;

impl LocalTree {
    /// Enumerate every regular file below `root` as a key.
    ///
    /// `filter` drops hidden and excluded keys. Symlinks and special files
    /// are skipped, as are names that cannot be spelled as a key (not UTF-8,
    /// or holding a backslash). An unreadable directory aborts the scan; a
    /// partial set is never returned.
    pub fn scan(root: &Path, filter: &KeyFilter) -> Result<KeySet> {
        Self::check_dir(root)?;

        let mut keys = Vec::new();

        for entry_result in WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .sort(false)
        {
            let entry = entry_result.map_err(|e| {
                SyncError::path(root, "walk local directory", io::Error::other(e.to_string()))
            })?;

            let file_type = entry.file_type();
            if !file_type.is_file() {
                if file_type.is_symlink() {
                    debug!(path = %entry.path().display(), "skipping symlink");
                }
                continue;
            }

            let path = entry.path();
            let relative = match path.strip_prefix(root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };

            let key = match PathKey::from_relative(relative) {
                Ok(key) => key,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "file name has no key, skipping");
                    continue;
                }
            };
            if filter.allows(&key) {
                keys.push(key);
            } else {
                debug!(key = %key, "excluded from scan");
            }
        }

        Ok(keys.into_iter().collect())
    }

    /// Scan only the part of the tree under `scope`.
    ///
    /// The scope must exist locally, either as a directory or as a single
    /// regular file. A symlinked scope yields no keys, as in a full scan.
    pub fn scan_scoped(root: &Path, scope: &PathKey, filter: &KeyFilter) -> Result<KeySet> {
        let target = scope.to_local(root);
        let meta = std::fs::symlink_metadata(&target)
            .map_err(|e| SyncError::path(&target, "stat scope", e))?;

        if meta.is_file() {
            return Ok(if filter.allows(scope) {
                std::iter::once(scope.clone()).collect()
            } else {
                KeySet::new()
            });
        }

        Self::scan(root, filter).map(|keys| keys.within(scope))
    }

    /// Absolute location of `key` under `root`.
    pub fn resolve(root: &Path, key: &PathKey) -> PathBuf {
        key.to_local(root)
    }

    fn check_dir(root: &Path) -> Result<()> {
        let meta = std::fs::metadata(root).map_err(|e| SyncError::path(root, "open local root", e))?;
        if !meta.is_dir() {
            return Err(SyncError::NotADirectory {
                path: root.to_path_buf(),
            });
        }
        Ok(())
    }
}

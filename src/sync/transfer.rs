//! Transfer Executor: one upload, download or delete per call.
//!
//! Every operation overwrites or removes exactly one object or file, so
//! repeating it after a failure leaves the same end state.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, SyncError, TransferAction};
use crate::fs::{LocalTree, Remote};
use crate::key::PathKey;

/// Outcome of a single transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub key: PathKey,
    pub action: TransferAction,
    pub bytes: u64,
}

/// Executes per-key transfers between a local root and the bucket.
#[derive(Debug, Clone)]
pub struct Transfer {
    remote: Remote,
    local_root: PathBuf,
}

impl Transfer {
    pub fn new(remote: Remote, local_root: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            local_root: local_root.into(),
        }
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    /// Copy `local_root/key` to the object `key`, replacing any existing one.
    pub async fn upload(&self, key: &PathKey) -> Result<TransferOutcome> {
        let local_path = LocalTree::resolve(&self.local_root, key);

        let content = tokio::fs::read(&local_path)
            .await
            .map_err(|e| SyncError::path(&local_path, "read local file", e))?;
        let bytes = content.len() as u64;

        self.remote
            .operator()
            .write(key.as_str(), content)
            .await
            .map_err(|e| SyncError::from_opendal(e, &format!("upload {key}")))?;

        info!(bytes, "{key} <----- uploading");
        Ok(TransferOutcome {
            key: key.clone(),
            action: TransferAction::Upload,
            bytes,
        })
    }

    /// Copy the object `key` to `local_root/key`, replacing any existing file.
    ///
    /// Bytes land in a hidden sibling file first and are renamed into place,
    /// so an interrupted download never leaves a truncated visible file.
    pub async fn download(&self, key: &PathKey) -> Result<TransferOutcome> {
        let local_path = LocalTree::resolve(&self.local_root, key);

        let content = self
            .remote
            .operator()
            .read(key.as_str())
            .await
            .map_err(|e| SyncError::from_opendal(e, &format!("download {key}")))?
            .to_vec();
        let bytes = content.len() as u64;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::path(parent, "create local directory", e))?;
        }

        let partial = partial_path(&local_path);
        tokio::fs::write(&partial, content)
            .await
            .map_err(|e| SyncError::path(&partial, "write local file", e))?;

        if let Err(e) = tokio::fs::rename(&partial, &local_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(SyncError::path(&local_path, "replace local file", e));
        }

        info!(bytes, "{key} <----- downloading");
        Ok(TransferOutcome {
            key: key.clone(),
            action: TransferAction::Download,
            bytes,
        })
    }

    /// Delete the object `key`. An already absent object counts as deleted.
    pub async fn delete_remote(&self, key: &PathKey) -> Result<TransferOutcome> {
        match self.remote.operator().delete(key.as_str()).await {
            Ok(()) => {}
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::from_opendal(e, &format!("delete {key}"))),
        }

        info!("{key} <----- deleting");
        Ok(TransferOutcome {
            key: key.clone(),
            action: TransferAction::Delete,
            bytes: 0,
        })
    }

    /// Run `action` for `key`, tagging any failure with the key.
    pub async fn run(&self, action: TransferAction, key: &PathKey) -> Result<TransferOutcome> {
        let result = match action {
            TransferAction::Upload => self.upload(key).await,
            TransferAction::Download => self.download(key).await,
            TransferAction::Delete => self.delete_remote(key).await,
        };
        result.map_err(|e| SyncError::transfer(key.as_str(), action, e))
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.storemaster-part"))
}

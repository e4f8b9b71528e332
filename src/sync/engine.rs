//! Sync engine: the named operations offered to the command surface.
//!
//! Each multi-key operation lists both sides, diffs them and then runs the
//! resulting transfers through a bounded pool. Listings are taken at roughly
//! the same instant but not atomically: another writer may change the bucket
//! between listing and transfer. There is no locking against that; running
//! the same operation again converges because every transfer is idempotent.
//! A failed transfer aborts the operation and transfers already done are kept.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SyncError, TransferAction};
use crate::fs::{self, LocalTree, Remote};
use crate::key::{KeySet, PathKey};
use crate::sync::bucket::{ensure_bucket, BucketState};
use crate::sync::diff::{diff, Diff};
use crate::sync::exclude::KeyFilter;
use crate::sync::index::RemoteIndex;
use crate::sync::transfer::{Transfer, TransferOutcome};

/// Multi-key operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Remote becomes an exact copy of the local key set (deletes extras).
    Mirror,
    /// Missing files are copied both ways; nothing is deleted.
    Bidirectional,
    /// Every visible remote object is deleted.
    Purge,
}

/// Engine options.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum concurrent transfers.
    pub workers: usize,
    /// Compute and report the plan without transferring anything.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.workers,
            dry_run: false,
        }
    }
}

/// Current sync phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Listing,
    Diffing,
    Transferring,
    Done,
}

/// Progress update for sync operations.
#[derive(Debug, Clone)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    /// Key whose transfer just finished.
    pub current: Option<PathKey>,
    pub done: usize,
    pub total: usize,
    pub bytes_done: u64,
}

impl SyncProgress {
    /// Get progress as a fraction (0.0 - 1.0).
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.done as f32 / self.total as f32
    }
}

/// Result of a multi-key operation.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub uploaded: Vec<PathKey>,
    pub downloaded: Vec<PathKey>,
    pub deleted: Vec<PathKey>,
    /// Keys present on both sides and left alone.
    pub unchanged: usize,
    pub bytes_transferred: u64,
    /// When set, the key lists are the plan; nothing was transferred.
    pub dry_run: bool,
    pub duration: Duration,
}

impl SyncReport {
    fn new(mode: SyncMode, dry_run: bool) -> Self {
        Self {
            mode,
            uploaded: Vec::new(),
            downloaded: Vec::new(),
            deleted: Vec::new(),
            unchanged: 0,
            bytes_transferred: 0,
            dry_run,
            duration: Duration::ZERO,
        }
    }

    /// Number of uploads, downloads and deletions.
    pub fn transfers(&self) -> usize {
        self.uploaded.len() + self.downloaded.len() + self.deleted.len()
    }
}

#[derive(Default)]
struct Tally {
    done: usize,
    total: usize,
    bytes: u64,
}

/// Sync engine for one bucket and one local root.
pub struct SyncEngine {
    transfer: Transfer,
    filter: KeyFilter,
    options: SyncOptions,
    progress_tx: Option<mpsc::Sender<SyncProgress>>,
}

impl SyncEngine {
    /// Create an engine, creating the bucket first if it does not exist.
    pub async fn open(
        remote: Remote,
        local_root: impl Into<PathBuf>,
        filter: KeyFilter,
        options: SyncOptions,
    ) -> Result<Self> {
        if ensure_bucket(remote.admin(), remote.bucket()).await? == BucketState::Created {
            info!(bucket = remote.bucket(), "created bucket");
        }
        debug!(
            backend = remote.backend_type().short_name(),
            bucket = remote.bucket(),
            "opened sync engine"
        );

        Ok(Self {
            transfer: Transfer::new(remote, local_root),
            filter,
            options,
            progress_tx: None,
        })
    }

    /// Connect to the S3 bucket described by `config` and open an engine.
    pub async fn connect(config: &Config, options: SyncOptions) -> Result<Self> {
        config.validate()?;
        let filter = KeyFilter::from_patterns(config.exclude.as_slice())?;
        let remote = fs::s3::connect(config).await?;
        Self::open(remote, config.local_dir.clone(), filter, options).await
    }

    /// Report progress of multi-key operations on `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<SyncProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn remote(&self) -> &Remote {
        self.transfer.remote()
    }

    pub fn local_root(&self) -> &std::path::Path {
        self.transfer.local_root()
    }

    /// Upload one file.
    pub async fn push_one(&self, key: &PathKey) -> Result<TransferOutcome> {
        self.check_visible(key)?;
        self.transfer.run(TransferAction::Upload, key).await
    }

    /// Download one object.
    pub async fn pull_one(&self, key: &PathKey) -> Result<TransferOutcome> {
        self.check_visible(key)?;
        self.transfer.run(TransferAction::Download, key).await
    }

    /// Make the remote key set equal to the local one.
    ///
    /// With a `scope`, only keys within it are considered on either side.
    /// Remote-only keys are deleted, then local-only keys are uploaded.
    /// Keys on both sides are assumed current and left untouched.
    pub async fn mirror_push(&self, scope: Option<&PathKey>) -> Result<SyncReport> {
        if let Some(scope) = scope {
            self.check_visible(scope)?;
        }

        let start = Instant::now();
        let mut report = SyncReport::new(SyncMode::Mirror, self.options.dry_run);
        let plan = self.plan(scope).await?;

        let deletions = plan.remote_only.sorted();
        let uploads = plan.local_only.sorted();
        report.unchanged = plan.common.len();

        let mut tally = Tally {
            total: deletions.len() + uploads.len(),
            ..Tally::default()
        };

        if self.options.dry_run {
            report.deleted = deletions;
            report.uploaded = uploads;
        } else {
            report.deleted = self.execute(TransferAction::Delete, &deletions, &mut tally).await?;
            report.uploaded = self.execute(TransferAction::Upload, &uploads, &mut tally).await?;
        }

        self.finish(report, tally, start).await
    }

    /// Copy local-only keys up and remote-only keys down. Never deletes.
    pub async fn sync_bidirectional(&self) -> Result<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport::new(SyncMode::Bidirectional, self.options.dry_run);
        let plan = self.plan(None).await?;

        let uploads = plan.local_only.sorted();
        let downloads = plan.remote_only.sorted();
        report.unchanged = plan.common.len();

        let mut tally = Tally {
            total: uploads.len() + downloads.len(),
            ..Tally::default()
        };

        if self.options.dry_run {
            report.uploaded = uploads;
            report.downloaded = downloads;
        } else {
            report.uploaded = self.execute(TransferAction::Upload, &uploads, &mut tally).await?;
            report.downloaded = self.execute(TransferAction::Download, &downloads, &mut tally).await?;
        }

        self.finish(report, tally, start).await
    }

    /// Delete every visible remote object, whatever the local state.
    pub async fn purge(&self) -> Result<SyncReport> {
        let start = Instant::now();
        let mut report = SyncReport::new(SyncMode::Purge, self.options.dry_run);

        self.send_progress(SyncPhase::Listing, None, &Tally::default()).await;
        let deletions = RemoteIndex::collect(self.remote(), &self.filter).await?.sorted();

        let mut tally = Tally {
            total: deletions.len(),
            ..Tally::default()
        };

        if self.options.dry_run {
            report.deleted = deletions;
        } else {
            report.deleted = self.execute(TransferAction::Delete, &deletions, &mut tally).await?;
        }

        self.finish(report, tally, start).await
    }

    /// Visible remote keys in lexical order. No mutation.
    pub async fn list(&self) -> Result<Vec<PathKey>> {
        Ok(RemoteIndex::collect(self.remote(), &self.filter).await?.sorted())
    }

    /// Scan the local tree and list the bucket concurrently, then diff.
    pub async fn plan(&self, scope: Option<&PathKey>) -> Result<Diff> {
        self.send_progress(SyncPhase::Listing, None, &Tally::default()).await;

        let root = self.transfer.local_root().to_path_buf();
        let filter = self.filter.clone();
        let scan_scope = scope.cloned();
        let scan_root = root.clone();
        let scan = tokio::task::spawn_blocking(move || match scan_scope {
            Some(scope) => LocalTree::scan_scoped(&scan_root, &scope, &filter),
            None => LocalTree::scan(&scan_root, &filter),
        });

        let (local, remote) = tokio::try_join!(
            async {
                scan.await
                    .map_err(|e| SyncError::path(&root, "scan local tree", io::Error::other(e)))?
            },
            RemoteIndex::collect(self.remote(), &self.filter),
        )?;

        let remote: KeySet = match scope {
            Some(scope) => remote.within(scope),
            None => remote,
        };

        self.send_progress(SyncPhase::Diffing, None, &Tally::default()).await;
        let plan = diff(&local, &remote);
        debug!(
            keys = plan.total(),
            local_only = plan.local_only.len(),
            remote_only = plan.remote_only.len(),
            common = plan.common.len(),
            "computed diff"
        );
        Ok(plan)
    }

    /// Run `action` for every key with at most `workers` in flight.
    ///
    /// Returns on the first failure; in-flight transfers are dropped.
    async fn execute(&self, action: TransferAction, keys: &[PathKey], tally: &mut Tally) -> Result<Vec<PathKey>> {
        let transfer = &self.transfer;
        let mut transfers = stream::iter(keys.iter().cloned())
            .map(|key| async move { transfer.run(action, &key).await })
            .buffer_unordered(self.options.workers.max(1));

        let mut completed = Vec::with_capacity(keys.len());
        while let Some(result) = transfers.next().await {
            let outcome = result?;
            tally.done += 1;
            tally.bytes += outcome.bytes;
            self.send_progress(SyncPhase::Transferring, Some(outcome.key.clone()), tally)
                .await;
            completed.push(outcome.key);
        }

        completed.sort();
        Ok(completed)
    }

    async fn finish(&self, mut report: SyncReport, tally: Tally, start: Instant) -> Result<SyncReport> {
        report.bytes_transferred = tally.bytes;
        report.duration = start.elapsed();
        self.send_progress(SyncPhase::Done, None, &tally).await;

        info!(
            mode = ?report.mode,
            uploaded = report.uploaded.len(),
            downloaded = report.downloaded.len(),
            deleted = report.deleted.len(),
            unchanged = report.unchanged,
            dry_run = report.dry_run,
            "sync finished"
        );
        Ok(report)
    }

    /// Send a progress update.
    async fn send_progress(&self, phase: SyncPhase, current: Option<PathKey>, tally: &Tally) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx
                .send(SyncProgress {
                    phase,
                    current,
                    done: tally.done,
                    total: tally.total,
                    bytes_done: tally.bytes,
                })
                .await;
        }
    }

    fn check_visible(&self, key: &PathKey) -> Result<()> {
        if self.filter.allows(key) {
            Ok(())
        } else {
            Err(SyncError::InvalidKey {
                key: key.to_string(),
                reason: "hidden or excluded keys are never transferred",
            })
        }
    }
}

//! Command-line surface.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "storemaster", version, about = "Keep a local data directory and an S3 bucket in step")]
pub struct Cli {
    /// TOML config file (default: ./storemaster.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Local root directory
    #[arg(long, alias = "local_dir", global = true)]
    pub local_dir: Option<PathBuf>,

    /// Bucket name
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Maximum concurrent transfers
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Show what would be transferred without doing it
    #[arg(long, alias = "dry_run", global = true)]
    pub dry_run: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Download one object into the local root
    Download { path: String },

    /// Upload one file from the local root
    Upload { path: String },

    /// Non-destructive two-way sync (same as `sync`)
    #[command(alias = "overwrite_remote")]
    OverwriteRemote,

    /// Make the bucket mirror the local tree, deleting remote extras
    #[command(alias = "force_upload")]
    ForceUpload {
        /// Limit the mirror to this file or directory
        path: Option<String>,
    },

    /// Non-destructive two-way sync
    Sync,

    /// List remote objects
    Remote,

    /// Delete every remote object
    Purge,

    /// Create the bucket if it does not exist
    #[command(alias = "create_bucket")]
    CreateBucket,
}

impl Cli {
    /// Apply command-line overrides on top of file and environment config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.local_dir {
            config.local_dir = dir.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = Some(endpoint.clone());
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

//! Configuration for the synchronizer.
//!
//! Values are layered: built-in defaults, then a TOML file, then
//! `STOREMASTER_*` environment variables, then command-line flags (applied by
//! the binary). The resulting [`Config`] is handed to the engine explicitly.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

pub const DEFAULT_BUCKET: &str = "sae-classification";
pub const DEFAULT_LOCAL_DIR: &str = "data";
pub const DEFAULT_CREDENTIALS_FILE: &str = ".credentials.json";
const LOCAL_CONFIG_FILE: &str = "storemaster.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bucket addressed by this deployment.
    pub bucket: String,
    /// Local root directory that mirrors the bucket.
    pub local_dir: PathBuf,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, ...).
    pub endpoint: Option<String>,
    /// Upper bound on concurrent per-key transfers.
    pub workers: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Glob patterns of keys to treat like hidden keys.
    pub exclude: Vec<String>,
    /// JSON file holding `AWS_ACCESS_KEY` / `AWS_SECRET_KEY`.
    pub credentials_file: PathBuf,
    pub retry: RetryConfig,
    /// Resolved by [`Config::load_credentials`], never read from TOML.
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

/// Backoff settings for remote calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per remote call, including the first.
    pub max_attempts: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            min_delay_ms: 200,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            region: "us-east-1".to_string(),
            endpoint: None,
            workers: 8,
            timeout_secs: 60,
            exclude: Vec::new(),
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            retry: RetryConfig::default(),
            credentials: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::path(path, "read config file", e))?;
        toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `explicit` if given, else the first config file found in the
    /// working directory or the user config directory, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::load(&local);
        }

        if let Some(path) = Self::default_path().filter(|p| p.is_file()) {
            return Self::load(&path);
        }

        Ok(Self::default())
    }

    /// `<config dir>/storemaster/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("storemaster").join("config.toml"))
    }

    /// Apply `STOREMASTER_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bucket) = lookup("STOREMASTER_BUCKET") {
            self.bucket = bucket;
        }
        if let Some(dir) = lookup("STOREMASTER_LOCAL_DIR") {
            self.local_dir = PathBuf::from(dir);
        }
        if let Some(region) = lookup("STOREMASTER_REGION") {
            self.region = region;
        }
        if let Some(endpoint) = lookup("STOREMASTER_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
    }

    /// Resolve credentials from the credentials file, then the environment.
    /// Leaves `credentials` empty when neither has them, so the storage
    /// clients fall back to their own credential chain.
    pub fn load_credentials<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.credentials = match Credentials::from_json_file(&self.credentials_file)? {
            Some(creds) => Some(creds),
            None => Credentials::from_env(lookup),
        };
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(SyncError::Config("bucket name must not be empty".to_string()));
        }
        if self.workers == 0 {
            return Err(SyncError::Config("workers must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(SyncError::Config(
                "retry.min_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Static access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "AWS_ACCESS_KEY")]
    access_key: Option<String>,
    #[serde(rename = "AWS_SECRET_KEY")]
    secret_key: Option<String>,
}

impl Credentials {
    /// Read a JSON credentials file. A missing file is `Ok(None)`; a file
    /// without both keys is a config error.
    pub fn from_json_file(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::path(path, "read credentials file", e)),
        };

        let file: CredentialsFile = serde_json::from_str(&content)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;

        match (file.access_key, file.secret_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Some(Self {
                access_key_id,
                secret_access_key,
            })),
            _ => Err(SyncError::Config(format!(
                "{}: expected both AWS_ACCESS_KEY and AWS_SECRET_KEY",
                path.display()
            ))),
        }
    }

    pub fn from_env<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pair = |id: &str, secret: &str| {
            Some(Self {
                access_key_id: lookup(id)?,
                secret_access_key: lookup(secret)?,
            })
        };
        pair("AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY").or_else(|| pair("AWS_ACCESS_KEY", "AWS_SECRET_KEY"))
    }
}

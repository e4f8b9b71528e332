// Library module for storemaster
// Re-exports modules for use in integration tests and the binary

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod key;
pub mod sync;

pub use config::Config;
pub use error::{ErrorKind, Result, SyncError};
pub use key::{KeySet, PathKey};
pub use sync::{SyncEngine, SyncOptions, SyncReport};

//! Key visibility rules.
//!
//! Hidden keys (any segment starting with `.`) are always invisible. Extra
//! glob patterns from the config hide more keys the same way: an invisible key
//! is never listed, uploaded, downloaded or deleted.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{Result, SyncError};
use crate::key::PathKey;

/// Decides which keys take part in a sync.
#[derive(Debug, Clone)]
pub struct KeyFilter {
    /// Compiled glob set for matching.
    glob_set: GlobSet,
    /// Raw pattern strings (for display).
    patterns: Vec<String>,
}

impl Default for KeyFilter {
    fn default() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }
}

impl KeyFilter {
    /// Hidden rule plus the given exclude patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .map_err(|e| SyncError::Config(format!("invalid exclude pattern {pattern:?}: {e}")))?;
            builder.add(glob);
            pattern_list.push(pattern.to_string());
        }

        let glob_set = builder
            .build()
            .map_err(|e| SyncError::Config(format!("invalid exclude patterns: {e}")))?;

        Ok(Self {
            glob_set,
            patterns: pattern_list,
        })
    }

    /// True if the key is visible to the synchronizer.
    pub fn allows(&self, key: &PathKey) -> bool {
        !key.is_hidden() && !self.is_excluded(key)
    }

    fn is_excluded(&self, key: &PathKey) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        if self.glob_set.is_match(key.as_str()) {
            return true;
        }

        // Patterns like "*.tmp" or "wandb" also match any single segment
        key.segments().any(|segment| self.glob_set.is_match(segment))
    }

    /// Get the list of patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

//! Set difference between a local scan and a remote listing.

use crate::key::{KeySet, PathKey};

/// Three disjoint partitions of `local ∪ remote`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub local_only: KeySet,
    pub remote_only: KeySet,
    pub common: KeySet,
}

impl Diff {
    /// Total number of distinct keys across both sides.
    pub fn total(&self) -> usize {
        self.local_only.len() + self.remote_only.len() + self.common.len()
    }

    pub fn is_in_sync(&self) -> bool {
        self.local_only.is_empty() && self.remote_only.is_empty()
    }
}

/// Partition two key sets by exact key match.
pub fn diff(local: &KeySet, remote: &KeySet) -> Diff {
    let mut local_only = Vec::new();
    let mut common = Vec::new();

    for key in local {
        if remote.contains(key) {
            common.push(key.clone());
        } else {
            local_only.push(key.clone());
        }
    }

    let remote_only: Vec<PathKey> = remote.iter().filter(|k| !local.contains(k)).cloned().collect();

    Diff {
        local_only: local_only.into_iter().collect(),
        remote_only: remote_only.into_iter().collect(),
        common: common.into_iter().collect(),
    }
}

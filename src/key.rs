//! Path keys and key sets.
//!
//! A [`PathKey`] is the forward-slash relative path that names a file both
//! under the local root and as an object in the bucket.

use std::collections::hash_set;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SyncError};

/// Normalized relative path, `/`-separated, no empty, `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    /// Parse a key, normalizing separators and stripping leading `/` and `./`.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.replace('\\', "/");
        let mut segments = Vec::new();

        for segment in normalized.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(SyncError::InvalidKey {
                        key: raw.to_string(),
                        reason: "parent directory segments are not allowed",
                    })
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(SyncError::InvalidKey {
                key: raw.to_string(),
                reason: "key is empty",
            });
        }

        Ok(Self(segments.join("/")))
    }

    /// Build a key from a path relative to a scan root.
    ///
    /// Every segment must be valid UTF-8 without a backslash, so the key maps back
    /// to the same file.
    pub fn from_relative(path: &Path) -> Result<Self> {
        let invalid = |reason| SyncError::InvalidKey {
            key: path.to_string_lossy().into_owned(),
            reason,
        };

        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| invalid("file name is not valid UTF-8"))?;
                    if name.contains('\\') {
                        return Err(invalid("file name contains a backslash"));
                    }
                    segments.push(name);
                }
                Component::CurDir => continue,
                _ => return Err(invalid("not a relative path below the root")),
            }
        }
        Self::parse(&segments.join("/"))
    }

    /// Accept either a bare key or a path that starts with the local root.
    /// A leading `./` on either side is ignored.
    pub fn from_user_path(local_root: &Path, raw: &str) -> Result<Self> {
        let as_path = without_cur_dir(Path::new(raw));
        if let Ok(stripped) = as_path.strip_prefix(without_cur_dir(local_root)) {
            return Self::from_relative(stripped);
        }
        Self::parse(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if any segment starts with `.`.
    pub fn is_hidden(&self) -> bool {
        self.segments().any(|s| s.starts_with('.'))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// True if `self` equals `prefix` or lies below it.
    pub fn is_within(&self, prefix: &PathKey) -> bool {
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0) && self.0.as_bytes().get(prefix.0.len()) == Some(&b'/'))
    }

    /// Location of this key under a local root.
    pub fn to_local(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.segments() {
            path.push(segment);
        }
        path
    }
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .skip_while(|c| matches!(c, Component::CurDir))
        .collect()
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PathKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unordered set of keys from one scan or listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    keys: HashSet<PathKey>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &PathKey) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> hash_set::Iter<'_, PathKey> {
        self.keys.iter()
    }

    /// Keys in lexical order, for display and deterministic scheduling.
    pub fn sorted(&self) -> Vec<PathKey> {
        let mut keys: Vec<PathKey> = self.keys.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Subset of keys lying within `prefix`.
    pub fn within(&self, prefix: &PathKey) -> KeySet {
        self.keys.iter().filter(|k| k.is_within(prefix)).cloned().collect()
    }
}

impl FromIterator<PathKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = PathKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for KeySet {
    type Item = PathKey;
    type IntoIter = hash_set::IntoIter<PathKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeySet {
    type Item = &'a PathKey;
    type IntoIter = hash_set::Iter<'a, PathKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

//! The folder chain: bucket root followed by descended folder segments.

use serde::{Deserialize, Serialize};

use gcsb_types::{BucketName, DisplayEntry};

/// Fixed id of the bucket root element.
pub const ROOT_ID: &str = "#bucket";

/// One element of a [`FolderChain`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderChainEntry {
    pub id: String,
    pub name: String,
    pub is_dir: bool,
}

impl FolderChainEntry {
    fn root(bucket: &BucketName) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            name: bucket.to_string(),
            is_dir: true,
        }
    }
}

impl From<&DisplayEntry> for FolderChainEntry {
    fn from(entry: &DisplayEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            is_dir: entry.is_dir,
        }
    }
}

/// Ordered path from the bucket root to the current folder.
///
/// Invariants:
/// - The chain is never empty. Element 0 is the bucket root, with id
///   [`ROOT_ID`] and the bucket name as its name.
/// - Elements 1..N are folder segments in traversal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderChain {
    bucket: BucketName,
    entries: Vec<FolderChainEntry>,
}

impl FolderChain {
    /// A chain positioned at the root of `bucket`.
    pub fn new(bucket: BucketName) -> Self {
        let root = FolderChainEntry::root(&bucket);
        Self {
            bucket,
            entries: vec![root],
        }
    }

    /// A chain positioned at `prefix` without visiting the folders on the
    /// way. Returns `None` unless `prefix` is empty or ends in `/`, or if it
    /// contains an empty segment.
    pub fn at_prefix(bucket: BucketName, prefix: &str) -> Option<Self> {
        let mut chain = Self::new(bucket);
        if prefix.is_empty() {
            return Some(chain);
        }
        let folders = prefix.strip_suffix('/')?;
        let mut id = String::new();
        for name in folders.split('/') {
            if name.is_empty() {
                return None;
            }
            id.push_str(name);
            id.push('/');
            chain.entries.push(FolderChainEntry {
                id: id.clone(),
                name: name.to_string(),
                is_dir: true,
            });
        }
        Some(chain)
    }

    pub fn bucket(&self) -> &BucketName {
        &self.bucket
    }

    pub fn entries(&self) -> &[FolderChainEntry] {
        &self.entries
    }

    /// Number of elements, root included. Always at least 1.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of folders descended below the root.
    pub fn depth(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_root(&self) -> bool {
        self.entries.len() == 1
    }

    /// Listing prefix of the current folder: `name + "/"` for every element
    /// below the root, in order. Empty at the root.
    pub fn prefix(&self) -> String {
        self.entries[1..]
            .iter()
            .map(|e| format!("{}/", e.name))
            .collect()
    }

    /// Descend into `folder`.
    ///
    /// If an element with the same id is already in the chain, the chain is
    /// truncated just after it instead (breadcrumb navigation to an
    /// ancestor). Returns `false` and leaves the chain alone if `folder` is
    /// not a directory.
    pub fn descend(&mut self, folder: FolderChainEntry) -> bool {
        if !folder.is_dir {
            return false;
        }
        match self.entries.iter().position(|e| e.id == folder.id) {
            Some(idx) => self.entries.truncate(idx + 1),
            None => self.entries.push(folder),
        }
        true
    }

    /// Truncate the chain to `index + 1` elements. Returns `false` if
    /// `index` is out of range.
    pub fn ascend_to(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.entries.truncate(index + 1);
        true
    }

    /// Go up one level. Returns `false` at the root.
    pub fn ascend(&mut self) -> bool {
        if self.is_root() {
            return false;
        }
        self.entries.pop();
        true
    }

    /// Replace the chain with a single root element for `bucket`.
    pub fn reset(&mut self, bucket: BucketName) {
        *self = Self::new(bucket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> BucketName {
        BucketName::parse("my-bucket").unwrap()
    }

    fn folder(id: &str, name: &str) -> FolderChainEntry {
        FolderChainEntry {
            id: id.into(),
            name: name.into(),
            is_dir: true,
        }
    }

    #[test]
    fn root_chain() {
        let chain = FolderChain::new(bucket());
        assert_eq!(chain.len(), 1);
        assert!(chain.is_root());
        assert_eq!(chain.entries()[0].id, ROOT_ID);
        assert_eq!(chain.entries()[0].name, "my-bucket");
        assert_eq!(chain.prefix(), "");
    }

    #[test]
    fn prefix_concatenates_segments() {
        let mut chain = FolderChain::new(bucket());
        chain.descend(folder("a/", "a"));
        chain.descend(folder("a/c/", "c"));
        assert_eq!(chain.prefix(), "a/c/");
        assert_eq!(chain.depth(), 2);
    }

    #[test]
    fn descend_into_ancestor_truncates() {
        let mut chain = FolderChain::new(bucket());
        chain.descend(folder("a/", "a"));
        chain.descend(folder("a/c/", "c"));
        chain.descend(folder("a/c/d/", "d"));
        assert!(chain.descend(folder("a/", "a")));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.prefix(), "a/");
    }

    #[test]
    fn descend_twice_does_not_double_append() {
        let mut chain = FolderChain::new(bucket());
        chain.descend(folder("a/", "a"));
        chain.descend(folder("a/", "a"));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn descend_into_root_id_resets_to_root() {
        let mut chain = FolderChain::new(bucket());
        chain.descend(folder("a/", "a"));
        chain.descend(folder(ROOT_ID, "my-bucket"));
        assert!(chain.is_root());
    }

    #[test]
    fn descend_rejects_files() {
        let mut chain = FolderChain::new(bucket());
        let file = FolderChainEntry {
            id: "x.txt".into(),
            name: "x.txt".into(),
            is_dir: false,
        };
        assert!(!chain.descend(file));
        assert!(chain.is_root());
    }

    #[test]
    fn ascend_to_and_ascend() {
        let mut chain = FolderChain::new(bucket());
        chain.descend(folder("a/", "a"));
        chain.descend(folder("a/c/", "c"));
        assert!(!chain.ascend_to(5));
        assert!(chain.ascend_to(1));
        assert_eq!(chain.prefix(), "a/");
        assert!(chain.ascend());
        assert!(chain.is_root());
        assert!(!chain.ascend());
    }

    #[test]
    fn reset_discards_depth() {
        let mut chain = FolderChain::new(bucket());
        chain.descend(folder("a/", "a"));
        chain.descend(folder("a/c/", "c"));
        chain.reset(BucketName::parse("other").unwrap());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.entries()[0].name, "other");
        assert_eq!(chain.bucket().as_str(), "other");
    }

    #[test]
    fn at_prefix_builds_every_level() {
        let chain = FolderChain::at_prefix(bucket(), "a/c/").unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.entries()[1], folder("a/", "a"));
        assert_eq!(chain.entries()[2], folder("a/c/", "c"));
        assert_eq!(chain.prefix(), "a/c/");

        assert!(FolderChain::at_prefix(bucket(), "").unwrap().is_root());
        assert!(FolderChain::at_prefix(bucket(), "a/c").is_none());
        assert!(FolderChain::at_prefix(bucket(), "a//c/").is_none());
        assert!(FolderChain::at_prefix(bucket(), "/").is_none());
    }

    #[test]
    fn prefix_always_ends_in_slash_or_is_empty() {
        let mut chain = FolderChain::new(bucket());
        for (id, name) in [("a/", "a"), ("a/b/", "b"), ("a/b/c/", "c")] {
            chain.descend(folder(id, name));
            let p = chain.prefix();
            assert!(p.ends_with('/'));
        }
        chain.ascend_to(0);
        assert!(chain.prefix().is_empty());
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::key::is_folder_key;

/// A set of selected [`DisplayEntry`](crate::DisplayEntry) ids.
///
/// Ids are unique and the order is irrelevant. Folder ids end in `/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection(BTreeSet<String>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The single selected key when exactly one entry is selected and it is
    /// not a folder. Editing and downloading are enabled only in this case.
    pub fn editable_key(&self) -> Option<&str> {
        if self.0.len() != 1 {
            return None;
        }
        self.0
            .iter()
            .next()
            .map(String::as_str)
            .filter(|id| !is_folder_key(id))
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Selection projected into the consumer's shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChange {
    pub bucket: String,
    /// Current folder path (the listing prefix).
    pub folder: String,
    pub selection: Selection,
}

impl SelectionChange {
    /// Returns `true` if edit and download actions should be enabled.
    pub fn is_editable(&self) -> bool {
        self.selection.editable_key().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_ids() {
        let sel: Selection = ["a.txt", "a.txt", "b.txt"].into_iter().collect();
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn editable_requires_exactly_one_file() {
        let empty = Selection::new();
        assert!(empty.editable_key().is_none());

        let one: Selection = ["x/a.txt"].into_iter().collect();
        assert_eq!(one.editable_key(), Some("x/a.txt"));

        let two: Selection = ["x/a.txt", "x/b.txt"].into_iter().collect();
        assert!(two.editable_key().is_none());

        let folder: Selection = ["x/sub/"].into_iter().collect();
        assert!(folder.editable_key().is_none());
    }

    #[test]
    fn change_is_editable() {
        let change = SelectionChange {
            bucket: "b".into(),
            folder: "x/".into(),
            selection: ["x/a.txt"].into_iter().collect(),
        };
        assert!(change.is_editable());
    }
}

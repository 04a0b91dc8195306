use std::fmt;

use serde::{Deserialize, Serialize};

use gcsb_types::DisplayEntry;

use crate::chain::FolderChainEntry;

/// User-initiated file actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Refresh,
    Upload,
    Download,
    CreateFolder,
    Delete,
    Rename,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Refresh => "refresh",
            Self::Upload => "upload",
            Self::Download => "download",
            Self::CreateFolder => "create-folder",
            Self::Delete => "delete",
            Self::Rename => "rename",
        };
        f.write_str(name)
    }
}

/// State published to UI collaborators after every change.
///
/// `revision` increases with every published snapshot. A collaborator that
/// issued a request at revision N can drop any result that arrives once a
/// later revision has been observed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub bucket: String,
    pub folder: String,
    pub chain: Vec<FolderChainEntry>,
    pub entries: Vec<DisplayEntry>,
    /// Set when the last refresh failed. The entry list is empty then,
    /// never stale.
    pub errored: bool,
    pub last_error: Option<String>,
    pub revision: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_display() {
        assert_eq!(FileAction::CreateFolder.to_string(), "create-folder");
        assert_eq!(format!("{}", FileAction::Delete), "delete");
    }

    #[test]
    fn default_snapshot_is_clean() {
        let s = ViewSnapshot::default();
        assert!(!s.errored);
        assert_eq!(s.revision, 0);
    }
}

use std::path::Path;

use gcsb_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{BrowserError, BrowserResult};
use crate::snapshot::FileAction;

/// Inline editing refuses objects larger than this many bytes.
pub const DEFAULT_MAX_EDIT_BYTES: u64 = 5 * 1024 * 1024;

/// Which mutating and transfer actions the browser offers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSet {
    pub upload: bool,
    pub download: bool,
    pub create_folder: bool,
    pub delete: bool,
    /// Also governs moving a file into another folder.
    pub rename: bool,
}

impl Default for ActionSet {
    fn default() -> Self {
        Self {
            upload: true,
            download: true,
            create_folder: true,
            delete: true,
            rename: true,
        }
    }
}

impl ActionSet {
    /// Browsing only: refresh and download stay available.
    pub fn read_only() -> Self {
        Self {
            upload: false,
            download: true,
            create_folder: false,
            delete: false,
            rename: false,
        }
    }

    pub fn allows(&self, action: FileAction) -> bool {
        match action {
            FileAction::Refresh => true,
            FileAction::Upload => self.upload,
            FileAction::Download => self.download,
            FileAction::CreateFolder => self.create_folder,
            FileAction::Delete => self.delete,
            FileAction::Rename => self.rename,
        }
    }

    /// Enabled actions, refresh first.
    pub fn enabled(&self) -> Vec<FileAction> {
        [
            FileAction::Refresh,
            FileAction::Upload,
            FileAction::Download,
            FileAction::CreateFolder,
            FileAction::Delete,
            FileAction::Rename,
        ]
        .into_iter()
        .filter(|a| self.allows(*a))
        .collect()
    }
}

/// Configuration of a folder projection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Bucket opened at mount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub max_edit_bytes: u64,
    /// Delete selected folders with everything under them even when the
    /// caller did not ask for a recursive delete.
    pub recursive_delete: bool,
    pub actions: ActionSet,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            max_edit_bytes: DEFAULT_MAX_EDIT_BYTES,
            recursive_delete: false,
            actions: ActionSet::default(),
        }
    }
}

/// Top-level configuration file.
///
/// ```toml
/// [store]
/// project = "my-project"
/// timeout_secs = 30
///
/// [browser]
/// bucket = "my-bucket"
///
/// [browser.actions]
/// delete = false
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsbConfig {
    pub store: StoreConfig,
    pub browser: BrowserConfig,
}

impl GcsbConfig {
    pub fn from_toml_str(text: &str) -> BrowserResult<Self> {
        toml::from_str(text).map_err(|e| BrowserError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> BrowserResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BrowserError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> BrowserResult<String> {
        toml::to_string_pretty(self).map_err(|e| BrowserError::Config(e.to_string()))
    }
}

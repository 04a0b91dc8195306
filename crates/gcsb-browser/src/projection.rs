//! The folder navigator.
//!
//! [`FolderProjection`] owns the folder chain of one bucket, lists the
//! current folder through an [`ObjectStoreClient`], and dispatches file
//! actions. Every operation takes `&mut self`, so a mutation and the
//! refresh that follows it always complete before the next command runs.

use std::sync::Arc;

use bytes::Bytes;
use gcsb_store::{ObjectStoreClient, StoreError};
use gcsb_types::{
    basename, folder_key, is_folder_key, parent_prefix, validate_name, BucketName, DisplayEntry,
    Selection, SelectionChange,
};
use tokio::sync::watch;

use crate::chain::{FolderChain, FolderChainEntry};
use crate::config::BrowserConfig;
use crate::error::{BrowserError, BrowserResult};
use crate::reconcile::reconcile;
use crate::snapshot::{FileAction, ViewSnapshot};

/// A downloaded object, named the way the browser saves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Download {
    pub key: String,
    /// `{bucket}_{basename}`.
    pub file_name: String,
    pub content: Bytes,
}

/// Stateful navigator over one bucket's simulated folder hierarchy.
///
/// States are implicit in the chain length: "at root" (1) or "at depth N"
/// (N + 1). The display list is recomputed from scratch on every refresh:
/// at mount, after navigation, and after every mutating action.
pub struct FolderProjection {
    store: Arc<dyn ObjectStoreClient>,
    config: BrowserConfig,
    chain: FolderChain,
    entries: Vec<DisplayEntry>,
    selection: Selection,
    last_error: Option<StoreError>,
    revision: u64,
    snapshots: watch::Sender<ViewSnapshot>,
    selections: watch::Sender<SelectionChange>,
}

impl FolderProjection {
    /// Create a projection at the root of `bucket`. No request is issued
    /// until [`mount`](Self::mount) or another refreshing operation.
    pub fn new(store: Arc<dyn ObjectStoreClient>, bucket: BucketName, config: BrowserConfig) -> Self {
        Self::with_chain(store, FolderChain::new(bucket), config)
    }

    /// Create a projection already positioned at the folder `prefix`,
    /// without listing the folders above it. Nothing checks that the folder
    /// exists until the first refresh.
    pub fn at_prefix(
        store: Arc<dyn ObjectStoreClient>,
        bucket: BucketName,
        prefix: &str,
        config: BrowserConfig,
    ) -> BrowserResult<Self> {
        let chain = FolderChain::at_prefix(bucket, prefix)
            .ok_or_else(|| BrowserError::Validation(format!("{prefix:?} is not a folder path")))?;
        Ok(Self::with_chain(store, chain, config))
    }

    fn with_chain(store: Arc<dyn ObjectStoreClient>, chain: FolderChain, config: BrowserConfig) -> Self {
        let (snapshots, _) = watch::channel(ViewSnapshot::default());
        let (selections, _) = watch::channel(SelectionChange {
            bucket: chain.bucket().to_string(),
            folder: chain.prefix(),
            selection: Selection::new(),
        });
        let projection = Self {
            store,
            config,
            chain,
            entries: Vec::new(),
            selection: Selection::new(),
            last_error: None,
            revision: 0,
            snapshots,
            selections,
        };
        projection.snapshots.send_replace(projection.snapshot());
        projection
    }

    /// Create a projection for the bucket named in `config`.
    pub fn from_config(store: Arc<dyn ObjectStoreClient>, config: BrowserConfig) -> BrowserResult<Self> {
        let name = config
            .bucket
            .clone()
            .ok_or_else(|| BrowserError::Config("no bucket configured".into()))?;
        let bucket = BucketName::parse(name)?;
        Ok(Self::new(store, bucket, config))
    }

    // ---- Accessors ----

    pub fn bucket(&self) -> &BucketName {
        self.chain.bucket()
    }

    pub fn chain(&self) -> &FolderChain {
        &self.chain
    }

    /// Listing prefix of the current folder (`""` at the root).
    pub fn current_path(&self) -> String {
        self.chain.prefix()
    }

    pub fn entries(&self) -> &[DisplayEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&DisplayEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Returns `true` if the last refresh failed.
    pub fn is_errored(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    pub fn available_actions(&self) -> Vec<FileAction> {
        self.config.actions.enabled()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<SelectionChange> {
        self.selections.subscribe()
    }

    /// Current state as published to subscribers.
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            bucket: self.bucket().to_string(),
            folder: self.current_path(),
            chain: self.chain.entries().to_vec(),
            entries: self.entries.clone(),
            errored: self.last_error.is_some(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            revision: self.revision,
        }
    }

    // ---- Navigation ----

    /// First listing after the browser is shown.
    pub async fn mount(&mut self) -> BrowserResult<()> {
        self.refresh().await
    }

    /// Open a folder entry of the current listing, or an element of the
    /// chain (breadcrumb). Clears the selection and refreshes.
    pub async fn descend(&mut self, entry: &DisplayEntry) -> BrowserResult<()> {
        self.descend_chain(FolderChainEntry::from(entry)).await
    }

    /// Like [`descend`](Self::descend), for an element taken from the chain.
    pub async fn descend_chain(&mut self, folder: FolderChainEntry) -> BrowserResult<()> {
        if !folder.is_dir {
            return Err(BrowserError::Validation(format!("{} is not a folder", folder.id)));
        }
        self.chain.descend(folder);
        tracing::debug!(bucket = %self.bucket(), folder = %self.current_path(), "navigated");
        self.navigated().await
    }

    /// Truncate the chain to `index + 1` elements (0 = bucket root) and
    /// refresh.
    pub async fn ascend_to(&mut self, index: usize) -> BrowserResult<()> {
        if !self.chain.ascend_to(index) {
            return Err(BrowserError::Validation(format!(
                "chain index {index} out of range (length {})",
                self.chain.len()
            )));
        }
        self.navigated().await
    }

    /// Go up one level and refresh. At the root this is a plain refresh.
    pub async fn ascend(&mut self) -> BrowserResult<()> {
        if self.chain.ascend() {
            self.navigated().await
        } else {
            self.refresh().await
        }
    }

    /// Switch to another bucket. The chain resets to a single root element
    /// and the selection is discarded. Selecting the current bucket again is
    /// a no-op.
    pub async fn bucket_changed(&mut self, bucket: &str) -> BrowserResult<()> {
        let bucket = BucketName::parse(bucket)?;
        if &bucket == self.bucket() {
            return Ok(());
        }
        tracing::info!(from = %self.bucket(), to = %bucket, "bucket changed");
        self.chain.reset(bucket);
        self.entries.clear();
        self.navigated().await
    }

    async fn navigated(&mut self) -> BrowserResult<()> {
        let refreshed = self.refresh().await;
        self.selection.clear();
        self.publish_selection();
        refreshed
    }

    // ---- Listing ----

    /// List the current folder and replace the display list.
    ///
    /// On failure the list is emptied and the view is marked errored; the
    /// next successful refresh clears the error.
    pub async fn refresh(&mut self) -> BrowserResult<()> {
        let bucket = self.bucket().to_string();
        let prefix = self.current_path();
        match self.store.list_objects(&bucket, &prefix, Default::default()).await {
            Ok(listing) => {
                self.entries = reconcile(&bucket, &prefix, &listing);
                self.last_error = None;
                let before = self.selection.len();
                let live: Selection = self
                    .selection
                    .iter()
                    .filter(|id| self.entries.iter().any(|e| e.id == *id))
                    .collect();
                self.selection = live;
                tracing::debug!(bucket, prefix, entries = self.entries.len(), "refreshed");
                self.publish();
                if self.selection.len() != before {
                    self.publish_selection();
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(bucket, prefix, error = %err, "refresh failed");
                self.entries.clear();
                self.last_error = Some(err.clone());
                self.publish();
                Err(err.into())
            }
        }
    }

    // ---- Selection ----

    /// Replace the selection and project it into the consumer's shape.
    pub fn change_selection<I, S>(&mut self, ids: I) -> SelectionChange
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = ids.into_iter().collect();
        self.publish_selection();
        self.selection_change()
    }

    pub fn selection_change(&self) -> SelectionChange {
        SelectionChange {
            bucket: self.bucket().to_string(),
            folder: self.current_path(),
            selection: self.selection.clone(),
        }
    }

    /// Returns `true` when exactly one non-folder entry is selected.
    pub fn can_edit(&self) -> bool {
        self.selection.editable_key().is_some()
    }

    // ---- Mutations ----

    /// Create a zero-byte folder marker `{prefix}{name}/` and refresh.
    pub async fn create_folder(&mut self, name: &str) -> BrowserResult<()> {
        self.require(FileAction::CreateFolder)?;
        validate_name(name)?;
        let key = folder_key(&self.current_path(), name);
        self.store
            .write(self.bucket().as_str(), &key, Bytes::new())
            .await?;
        tracing::info!(bucket = %self.bucket(), key, "created folder");
        self.refresh().await
    }

    /// Write `content` to `{prefix}{file_name}` and refresh. An existing
    /// object of the same name is overwritten.
    pub async fn upload(&mut self, file_name: &str, content: impl Into<Bytes>) -> BrowserResult<()> {
        self.require(FileAction::Upload)?;
        validate_name(file_name)?;
        let key = format!("{}{file_name}", self.current_path());
        let content = content.into();
        let size = content.len();
        self.store.write(self.bucket().as_str(), &key, content).await?;
        tracing::info!(bucket = %self.bucket(), key, size, "uploaded");
        self.refresh().await
    }

    /// Rename the single selected file within its folder.
    ///
    /// Returns `false` without any request when `new_name` equals the
    /// current name. The rename is a move (copy then delete) and is not
    /// atomic: the folder is refreshed either way so a half-done move shows
    /// up, and the move error is returned.
    pub async fn rename_selected(&mut self, new_name: &str) -> BrowserResult<bool> {
        self.require(FileAction::Rename)?;
        let source = self.single_selected()?.to_string();
        if is_folder_key(&source) {
            return Err(BrowserError::InvalidSelection("folders cannot be renamed".into()));
        }
        if basename(&source) == new_name {
            return Ok(false);
        }
        validate_name(new_name)?;
        let target = format!("{}{new_name}", parent_prefix(&source));
        self.relocate(&source, &target).await?;
        Ok(true)
    }

    /// Move a file into a folder, keeping its name.
    ///
    /// `destination` is a folder id (ending in `/`). Folders cannot be
    /// moved. Returns `false` when the file is already there.
    pub async fn move_into(&mut self, source: &str, destination: &str) -> BrowserResult<bool> {
        self.require(FileAction::Rename)?;
        if is_folder_key(source) {
            return Err(BrowserError::Validation(format!("cannot move folder {source}")));
        }
        if !is_folder_key(destination) && !destination.is_empty() {
            return Err(BrowserError::Validation(format!("{destination} is not a folder")));
        }
        let target = format!("{destination}{}", basename(source));
        if target == source {
            return Ok(false);
        }
        self.relocate(source, &target).await?;
        Ok(true)
    }

    /// Delete every selected entry, one after another.
    ///
    /// Files are deleted by key. Folders are deleted recursively when
    /// `recursive` or [`BrowserConfig::recursive_delete`] is set, otherwise
    /// their literal key is targeted. The first
    /// failure aborts the rest of the batch. The folder is refreshed once
    /// afterwards whatever the outcome, and the first failure is returned.
    /// Returns the number of keys deleted.
    pub async fn delete_selected(&mut self, recursive: bool) -> BrowserResult<usize> {
        self.require(FileAction::Delete)?;
        if self.selection.is_empty() {
            return Err(BrowserError::NoSelection);
        }
        let recursive = recursive || self.config.recursive_delete;
        let bucket = self.bucket().to_string();
        let targets: Vec<String> = self.selection.iter().map(str::to_string).collect();

        let mut deleted = 0;
        let mut failure = None;
        for id in &targets {
            let outcome = if is_folder_key(id) {
                self.store.delete(&bucket, id, recursive).await
            } else {
                self.store.delete_object(&bucket, id).await.map(|()| 1)
            };
            match outcome {
                Ok(n) => deleted += n,
                Err(err) => {
                    tracing::warn!(bucket, key = id.as_str(), deleted, error = %err, "delete batch aborted");
                    failure = Some(err);
                    break;
                }
            }
        }

        let refreshed = self.refresh().await;
        match failure {
            Some(err) => Err(err.into()),
            None => refreshed.map(|()| deleted),
        }
    }

    /// Fetch the single selected file for saving as `{bucket}_{name}`.
    pub async fn download_selected(&self) -> BrowserResult<Download> {
        self.require(FileAction::Download)?;
        let key = self
            .selection
            .editable_key()
            .ok_or_else(|| BrowserError::InvalidSelection("select exactly one file".into()))?
            .to_string();
        let content = self.store.get_data(self.bucket().as_str(), &key).await?;
        Ok(Download {
            file_name: format!("{}_{}", self.bucket(), basename(&key)),
            key,
            content,
        })
    }

    // ---- Internals ----

    async fn relocate(&mut self, source: &str, target: &str) -> BrowserResult<()> {
        let bucket = self.bucket().to_string();
        let moved = self
            .store
            .move_object(&bucket, source, &bucket, target)
            .await;
        let refreshed = self.refresh().await;
        match moved {
            Ok(_) => {
                tracing::info!(bucket, source, target, "moved");
                refreshed
            }
            Err(err) => Err(err.into()),
        }
    }

    fn require(&self, action: FileAction) -> BrowserResult<()> {
        if self.config.actions.allows(action) {
            Ok(())
        } else {
            Err(BrowserError::ActionDisabled(action))
        }
    }

    fn single_selected(&self) -> BrowserResult<&str> {
        let mut ids = self.selection.iter();
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(BrowserError::NoSelection),
            (Some(_), Some(_)) => Err(BrowserError::InvalidSelection(
                "only one entry can be renamed".into(),
            )),
        }
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.snapshots.send_replace(self.snapshot());
    }

    fn publish_selection(&self) {
        self.selections.send_replace(self.selection_change());
    }
}

impl std::fmt::Debug for FolderProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderProjection")
            .field("bucket", self.bucket())
            .field("folder", &self.current_path())
            .field("entries", &self.entries.len())
            .field("selected", &self.selection.len())
            .field("errored", &self.is_errored())
            .finish()
    }
}

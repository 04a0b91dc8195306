//! Text editing of a single object.

use std::sync::Arc;

use bytes::Bytes;
use gcsb_store::ObjectStoreClient;
use gcsb_types::{ObjectMetadata, SelectionChange};

use crate::error::{BrowserError, BrowserResult};

/// An object loaded for editing.
///
/// Opening checks the object's size before fetching its content, so an
/// oversized object is never downloaded. Saving overwrites the whole
/// object; there is no conflict detection against concurrent writers.
pub struct EditorSession {
    store: Arc<dyn ObjectStoreClient>,
    bucket: String,
    key: String,
    text: String,
    dirty: bool,
}

impl EditorSession {
    /// Open the single selected file of `selection`.
    pub async fn open(
        store: Arc<dyn ObjectStoreClient>,
        selection: &SelectionChange,
        max_bytes: u64,
    ) -> BrowserResult<Self> {
        let key = selection
            .selection
            .editable_key()
            .ok_or_else(|| BrowserError::InvalidSelection("select exactly one file to edit".into()))?
            .to_string();
        Self::open_key(store, &selection.bucket, &key, max_bytes).await
    }

    /// Open `key` in `bucket` directly.
    pub async fn open_key(
        store: Arc<dyn ObjectStoreClient>,
        bucket: &str,
        key: &str,
        max_bytes: u64,
    ) -> BrowserResult<Self> {
        let metadata = store.get_metadata(bucket, key).await?;
        if metadata.size > max_bytes {
            return Err(BrowserError::TooLarge {
                size: metadata.size,
                limit: max_bytes,
            });
        }
        let content = store.get_data(bucket, key).await?;
        let text = String::from_utf8(content.to_vec())
            .map_err(|_| BrowserError::NotText(format!("gs://{bucket}/{key}")))?;
        tracing::debug!(bucket, key, size = metadata.size, "opened for editing");
        Ok(Self {
            store,
            bucket: bucket.to_string(),
            key: key.to_string(),
            text,
            dirty: false,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `gs://{bucket}/{key}`.
    pub fn display_name(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.key)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.dirty = true;
        }
    }

    /// Returns `true` if the text changed since it was loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the text back to the object. The dirty flag is cleared only
    /// when the write succeeds.
    pub async fn save(&mut self) -> BrowserResult<ObjectMetadata> {
        let content = Bytes::from(self.text.clone().into_bytes());
        let metadata = self.store.write(&self.bucket, &self.key, content).await?;
        self.dirty = false;
        tracing::info!(bucket = %self.bucket, key = %self.key, size = metadata.size, "saved");
        Ok(metadata)
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("object", &self.display_name())
            .field("len", &self.text.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use gcsb_types::{to_path, BucketInfo, ListResult, ObjectMetadata};

use crate::error::StoreResult;

/// Options for [`ObjectStoreClient::list_objects`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListOptions {
    /// Group keys on the next `/` into common prefixes. When `false`, every
    /// key under the prefix is returned regardless of depth.
    pub delimiter: bool,
}

impl ListOptions {
    /// One folder level at a time.
    pub const fn delimited() -> Self {
        Self { delimiter: true }
    }

    /// Every key under the prefix.
    pub const fn recursive() -> Self {
        Self { delimiter: false }
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::delimited()
    }
}

/// Stateless façade over a bucket's object API.
///
/// All implementations must satisfy these invariants:
/// - Keys are bare keys. Ids returned by listings are normalized with
///   [`to_path`] before they are passed back in.
/// - A listing either returns complete results or fails; callers never see
///   a partial page set.
/// - An empty payload is a valid write (folder markers are zero-byte
///   objects whose key ends in `/`).
/// - Errors are propagated, never retried.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// List the buckets of a project.
    async fn list_buckets(&self, project: &str) -> StoreResult<Vec<BucketInfo>>;

    /// List objects under `prefix`.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> StoreResult<ListResult>;

    /// Read an object's metadata. Used to pre-flight size before loading.
    async fn get_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata>;

    /// Read an object's full body into memory.
    ///
    /// There is no range support. Callers apply their own size ceiling.
    async fn get_data(&self, bucket: &str, key: &str) -> StoreResult<Bytes>;

    /// Create or overwrite an object.
    async fn write(&self, bucket: &str, key: &str, content: Bytes) -> StoreResult<ObjectMetadata>;

    /// Delete exactly one key.
    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    /// Server-side copy. The source is unaffected.
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<ObjectMetadata>;

    /// Copy then delete the source. This is also how rename is done.
    ///
    /// Not atomic: a failure before the copy leaves only the source, a
    /// failure after the copy but during the delete leaves both objects.
    async fn move_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<ObjectMetadata> {
        let copied = self.copy(src_bucket, src_key, dst_bucket, dst_key).await?;
        if let Err(err) = self.delete_object(src_bucket, src_key).await {
            tracing::warn!(
                src_bucket,
                src_key,
                dst_bucket,
                dst_key,
                error = %err,
                "move: copy succeeded but source delete failed, both objects remain"
            );
            return Err(err);
        }
        tracing::info!(src_bucket, src_key, dst_bucket, dst_key, "moved object");
        Ok(copied)
    }

    /// Delete every key under `prefix`, one at a time, in listing order.
    ///
    /// Returns the number of keys deleted. Not atomic: a failing delete
    /// aborts the remaining ones and earlier deletes stay deleted.
    async fn recursive_delete(&self, bucket: &str, prefix: &str) -> StoreResult<usize> {
        let listing = self
            .list_objects(bucket, prefix, ListOptions::recursive())
            .await?;
        let keys: Vec<String> = listing
            .items
            .iter()
            .map(|item| to_path(bucket, &item.id))
            .collect();
        let total = keys.len();
        for (done, key) in keys.iter().enumerate() {
            if let Err(err) = self.delete_object(bucket, key).await {
                tracing::warn!(
                    bucket,
                    prefix,
                    key = key.as_str(),
                    deleted = done,
                    total,
                    error = %err,
                    "recursive delete aborted"
                );
                return Err(err);
            }
        }
        tracing::info!(bucket, prefix, deleted = total, "recursive delete complete");
        Ok(total)
    }

    /// Delete `key`, or everything under it when `recursive` is set.
    /// Returns the number of keys deleted.
    async fn delete(&self, bucket: &str, key: &str, recursive: bool) -> StoreResult<usize> {
        if recursive {
            self.recursive_delete(bucket, key).await
        } else {
            self.delete_object(bucket, key).await?;
            Ok(1)
        }
    }
}

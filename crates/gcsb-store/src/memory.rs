use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use gcsb_types::{BucketInfo, ListResult, ObjectItem, ObjectMetadata};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ListOptions, ObjectStoreClient};

/// Operation kinds, used to target injected failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ListBuckets,
    List,
    GetMetadata,
    GetData,
    Write,
    Delete,
    Copy,
}

/// One recorded call against an [`InMemoryObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    ListBuckets { project: String },
    List { bucket: String, prefix: String, delimiter: bool },
    GetMetadata { bucket: String, key: String },
    GetData { bucket: String, key: String },
    Write { bucket: String, key: String, len: usize },
    Delete { bucket: String, key: String },
    Copy { src_bucket: String, src_key: String, dst_bucket: String, dst_key: String },
}

impl StoreCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::ListBuckets { .. } => Operation::ListBuckets,
            Self::List { .. } => Operation::List,
            Self::GetMetadata { .. } => Operation::GetMetadata,
            Self::GetData { .. } => Operation::GetData,
            Self::Write { .. } => Operation::Write,
            Self::Delete { .. } => Operation::Delete,
            Self::Copy { .. } => Operation::Copy,
        }
    }
}

#[derive(Clone, Debug)]
struct StoredObject {
    content: Bytes,
    generation: u64,
    updated: DateTime<Utc>,
}

#[derive(Debug)]
struct Fault {
    operation: Operation,
    /// Calls of `operation` still to let through before failing.
    remaining: usize,
    error: StoreError,
}

/// In-memory object store.
///
/// Intended for tests and embedding. Buckets map keys to objects in sorted
/// order, so listings come back in the same lexicographic order the JSON
/// API uses. Every call is recorded, and failures can be injected per
/// operation to exercise the non-atomic composite operations.
pub struct InMemoryObjectStore {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    next_generation: AtomicU64,
    calls: Mutex<Vec<StoreCall>>,
    faults: Mutex<Vec<Fault>>,
}

impl InMemoryObjectStore {
    /// Create a new store with no buckets.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            next_generation: AtomicU64::new(1_000_000),
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    /// Create a store holding one empty bucket.
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.create_bucket(bucket);
        store
    }

    /// Create an empty bucket. No-op if it already exists.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .expect("lock poisoned")
            .entry(bucket.to_string())
            .or_default();
    }

    /// Insert an object directly, bypassing call recording and faults.
    pub fn insert(&self, bucket: &str, key: &str, content: impl Into<Bytes>) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.buckets
            .write()
            .expect("lock poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    content: content.into(),
                    generation,
                    updated: Utc::now(),
                },
            );
    }

    /// Returns `true` if `key` exists in `bucket`.
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .expect("lock poisoned")
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key))
    }

    /// Sorted keys of a bucket.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .expect("lock poisoned")
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content of an object, bypassing call recording.
    pub fn content(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .expect("lock poisoned")
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| obj.content.clone())
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Recorded calls of one operation kind.
    pub fn calls_of(&self, operation: Operation) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation() == operation)
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().expect("lock poisoned").clear();
    }

    /// Make the next call of `operation` fail.
    pub fn fail_next(&self, operation: Operation) {
        self.fail_nth(operation, 1);
    }

    /// Make the `n`th upcoming call of `operation` fail (1-based).
    pub fn fail_nth(&self, operation: Operation, n: usize) {
        self.fail_nth_with(
            operation,
            n,
            StoreError::Api {
                status: 503,
                message: "injected failure".into(),
            },
        );
    }

    /// Make the `n`th upcoming call of `operation` fail with `error`.
    pub fn fail_nth_with(&self, operation: Operation, n: usize, error: StoreError) {
        self.faults.lock().expect("lock poisoned").push(Fault {
            operation,
            remaining: n.saturating_sub(1),
            error,
        });
    }

    fn record(&self, call: StoreCall) -> StoreResult<()> {
        let operation = call.operation();
        self.calls.lock().expect("lock poisoned").push(call);

        let mut faults = self.faults.lock().expect("lock poisoned");
        let mut fired = None;
        for (idx, fault) in faults.iter_mut().enumerate() {
            if fault.operation != operation {
                continue;
            }
            if fault.remaining == 0 {
                if fired.is_none() {
                    fired = Some(idx);
                }
            } else {
                fault.remaining -= 1;
            }
        }
        match fired {
            Some(idx) => Err(faults.remove(idx).error),
            None => Ok(()),
        }
    }

    fn metadata(bucket: &str, key: &str, obj: &StoredObject) -> ObjectMetadata {
        ObjectMetadata {
            name: key.to_string(),
            bucket: bucket.to_string(),
            size: obj.content.len() as u64,
            updated: Some(obj.updated),
            generation: obj.generation,
            content_type: None,
            id: format!("{bucket}/{key}/{}", obj.generation),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryObjectStore {
    async fn list_buckets(&self, project: &str) -> StoreResult<Vec<BucketInfo>> {
        self.record(StoreCall::ListBuckets {
            project: project.to_string(),
        })?;
        if project.is_empty() {
            return Err(StoreError::Validation("project must not be empty".into()));
        }
        let buckets = self.buckets.read().expect("lock poisoned");
        Ok(buckets
            .keys()
            .map(|name| BucketInfo {
                name: name.clone(),
                location: None,
                storage_class: None,
                time_created: None,
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> StoreResult<ListResult> {
        self.record(StoreCall::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            delimiter: options.delimiter,
        })?;
        let buckets = self.buckets.read().expect("lock poisoned");
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;

        let mut items = Vec::new();
        let mut prefixes = BTreeSet::new();
        for (key, obj) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            match rest.find('/') {
                Some(idx) if options.delimiter => {
                    prefixes.insert(format!("{prefix}{}", &rest[..=idx]));
                }
                _ => items.push(ObjectItem {
                    name: key.clone(),
                    size: obj.content.len() as u64,
                    updated: Some(obj.updated),
                    id: format!("{bucket}/{key}/{}", obj.generation),
                }),
            }
        }
        tracing::debug!(bucket, prefix, items = items.len(), prefixes = prefixes.len(), "listed");
        Ok(ListResult {
            items,
            prefixes: prefixes.into_iter().collect(),
            next_page_token: None,
        })
    }

    async fn get_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        self.record(StoreCall::GetMetadata {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        let buckets = self.buckets.read().expect("lock poisoned");
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        let obj = objects
            .get(key)
            .ok_or_else(|| StoreError::not_found(bucket, key))?;
        Ok(Self::metadata(bucket, key, obj))
    }

    async fn get_data(&self, bucket: &str, key: &str) -> StoreResult<Bytes> {
        self.record(StoreCall::GetData {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        let buckets = self.buckets.read().expect("lock poisoned");
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .get(key)
            .map(|obj| obj.content.clone())
            .ok_or_else(|| StoreError::not_found(bucket, key))
    }

    async fn write(&self, bucket: &str, key: &str, content: Bytes) -> StoreResult<ObjectMetadata> {
        self.record(StoreCall::Write {
            bucket: bucket.to_string(),
            key: key.to_string(),
            len: content.len(),
        })?;
        if key.is_empty() {
            return Err(StoreError::Validation("object name must not be empty".into()));
        }
        let mut buckets = self.buckets.write().expect("lock poisoned");
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        let obj = StoredObject {
            content,
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            updated: Utc::now(),
        };
        let meta = Self::metadata(bucket, key, &obj);
        objects.insert(key.to_string(), obj);
        tracing::info!(bucket, key, size = meta.size, "wrote object");
        Ok(meta)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.record(StoreCall::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        let mut buckets = self.buckets.write().expect("lock poisoned");
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        if objects.remove(key).is_none() {
            return Err(StoreError::not_found(bucket, key));
        }
        tracing::info!(bucket, key, "deleted object");
        Ok(())
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> StoreResult<ObjectMetadata> {
        self.record(StoreCall::Copy {
            src_bucket: src_bucket.to_string(),
            src_key: src_key.to_string(),
            dst_bucket: dst_bucket.to_string(),
            dst_key: dst_key.to_string(),
        })?;
        let mut buckets = self.buckets.write().expect("lock poisoned");
        let content = buckets
            .get(src_bucket)
            .ok_or_else(|| StoreError::BucketNotFound(src_bucket.to_string()))?
            .get(src_key)
            .ok_or_else(|| StoreError::not_found(src_bucket, src_key))?
            .content
            .clone();
        let objects = buckets
            .get_mut(dst_bucket)
            .ok_or_else(|| StoreError::BucketNotFound(dst_bucket.to_string()))?;
        let obj = StoredObject {
            content,
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            updated: Utc::now(),
        };
        let meta = Self::metadata(dst_bucket, dst_key, &obj);
        objects.insert(dst_key.to_string(), obj);
        tracing::info!(src_bucket, src_key, dst_bucket, dst_key, "copied object");
        Ok(meta)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.buckets.read().expect("lock poisoned");
        let count: usize = buckets.values().map(BTreeMap::len).sum();
        f.debug_struct("InMemoryObjectStore")
            .field("bucket_count", &buckets.len())
            .field("object_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcsb_types::to_path;

    const B: &str = "my-bucket";

    fn seeded() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::with_bucket(B);
        store.insert(B, "a/", "");
        store.insert(B, "a/b.txt", "hello world!");
        store.insert(B, "a/c/d.txt", "nested");
        store.insert(B, "a/c/e.txt", "nested too");
        store.insert(B, "top.txt", "top");
        store
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delimited_listing_yields_one_level() {
        let store = seeded();
        let result = store.list_objects(B, "a/", ListOptions::delimited()).await.unwrap();
        let names: Vec<&str> = result.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a/", "a/b.txt"]);
        assert_eq!(result.prefixes, vec!["a/c/".to_string()]);
    }

    #[tokio::test]
    async fn root_listing() {
        let store = seeded();
        let result = store.list_objects(B, "", ListOptions::delimited()).await.unwrap();
        let names: Vec<&str> = result.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["top.txt"]);
        assert_eq!(result.prefixes, vec!["a/".to_string()]);
    }

    #[tokio::test]
    async fn recursive_listing_returns_every_depth() {
        let store = seeded();
        let result = store.list_objects(B, "a/", ListOptions::recursive()).await.unwrap();
        assert_eq!(result.items.len(), 4);
        assert!(result.prefixes.is_empty());
    }

    #[tokio::test]
    async fn listing_ids_are_generation_qualified() {
        let store = seeded();
        let result = store.list_objects(B, "a/", ListOptions::delimited()).await.unwrap();
        let item = &result.items[1];
        assert!(item.id.starts_with("my-bucket/a/b.txt/"));
        assert_eq!(to_path(B, &item.id), "a/b.txt");
        assert_eq!(item.size, 12);
    }

    #[tokio::test]
    async fn listing_unknown_bucket_fails() {
        let store = InMemoryObjectStore::new();
        let err = store.list_objects("nope", "", ListOptions::default()).await.unwrap_err();
        assert_eq!(err, StoreError::BucketNotFound("nope".into()));
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn write_read_and_metadata() {
        let store = InMemoryObjectStore::with_bucket(B);
        let meta = store.write(B, "x/y.txt", Bytes::from_static(b"data")).await.unwrap();
        assert_eq!(meta.size, 4);
        assert_eq!(meta.name, "x/y.txt");

        let data = store.get_data(B, "x/y.txt").await.unwrap();
        assert_eq!(&data[..], b"data");

        let fetched = store.get_metadata(B, "x/y.txt").await.unwrap();
        assert_eq!(fetched.generation, meta.generation);
    }

    #[tokio::test]
    async fn empty_write_creates_folder_marker() {
        let store = InMemoryObjectStore::with_bucket(B);
        store.write(B, "x/new/", Bytes::new()).await.unwrap();
        assert!(store.contains(B, "x/new/"));
        let result = store.list_objects(B, "x/", ListOptions::delimited()).await.unwrap();
        assert_eq!(result.prefixes, vec!["x/new/".to_string()]);
    }

    #[tokio::test]
    async fn overwrite_bumps_generation() {
        let store = InMemoryObjectStore::with_bucket(B);
        let first = store.write(B, "k", Bytes::from_static(b"1")).await.unwrap();
        let second = store.write(B, "k", Bytes::from_static(b"22")).await.unwrap();
        assert!(second.generation > first.generation);
        assert_eq!(store.content(B, "k").unwrap(), Bytes::from_static(b"22"));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = InMemoryObjectStore::with_bucket(B);
        let err = store.delete_object(B, "ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryObjectStore::with_bucket(B);
        assert!(store.get_data(B, "ghost").await.unwrap_err().is_not_found());
        assert!(store.get_metadata(B, "ghost").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn copy_leaves_source() {
        let store = seeded();
        store.copy(B, "top.txt", B, "copy.txt").await.unwrap();
        assert!(store.contains(B, "top.txt"));
        assert_eq!(store.content(B, "copy.txt").unwrap(), Bytes::from_static(b"top"));
    }

    #[tokio::test]
    async fn list_buckets_requires_project() {
        let store = seeded();
        let buckets = store.list_buckets("proj").await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, B);
        assert!(store.list_buckets("").await.is_err());
    }

    // -----------------------------------------------------------------------
    // Move
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn move_success_leaves_only_destination() {
        let store = seeded();
        store.move_object(B, "a/b.txt", B, "a/renamed.txt").await.unwrap();
        let result = store.list_objects(B, "a/", ListOptions::delimited()).await.unwrap();
        let names: Vec<&str> = result.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a/", "a/renamed.txt"]);
    }

    #[tokio::test]
    async fn move_with_failed_delete_leaves_both() {
        let store = seeded();
        store.fail_next(Operation::Delete);
        let err = store.move_object(B, "a/b.txt", B, "a/renamed.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 503, .. }));
        let result = store.list_objects(B, "a/", ListOptions::delimited()).await.unwrap();
        let names: Vec<&str> = result.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a/", "a/b.txt", "a/renamed.txt"]);
    }

    #[tokio::test]
    async fn move_with_failed_copy_leaves_only_source() {
        let store = seeded();
        store.fail_next(Operation::Copy);
        assert!(store.move_object(B, "a/b.txt", B, "a/renamed.txt").await.is_err());
        assert!(store.contains(B, "a/b.txt"));
        assert!(!store.contains(B, "a/renamed.txt"));
        assert!(store.calls_of(Operation::Delete).is_empty());
    }

    // -----------------------------------------------------------------------
    // Recursive delete
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn recursive_delete_issues_one_delete_per_key_in_order() {
        let store = seeded();
        store.clear_calls();
        let deleted = store.recursive_delete(B, "a/").await.unwrap();
        assert_eq!(deleted, 4);

        let deletes: Vec<String> = store
            .calls_of(Operation::Delete)
            .into_iter()
            .map(|c| match c {
                StoreCall::Delete { key, .. } => key,
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert_eq!(deletes, vec!["a/", "a/b.txt", "a/c/d.txt", "a/c/e.txt"]);
        assert_eq!(store.keys(B), vec!["top.txt".to_string()]);
    }

    #[tokio::test]
    async fn recursive_delete_stops_on_failure() {
        let store = seeded();
        store.clear_calls();
        store.fail_nth(Operation::Delete, 2);
        let err = store.recursive_delete(B, "a/").await.unwrap_err();
        assert!(matches!(err, StoreError::Api { .. }));

        // Call 1 succeeded, call 2 failed, calls 3..4 never issued.
        assert_eq!(store.calls_of(Operation::Delete).len(), 2);
        assert!(!store.contains(B, "a/"));
        assert!(store.contains(B, "a/b.txt"));
        assert!(store.contains(B, "a/c/d.txt"));
        assert!(store.contains(B, "a/c/e.txt"));
    }

    #[tokio::test]
    async fn recursive_delete_listing_failure_deletes_nothing() {
        let store = seeded();
        store.fail_next(Operation::List);
        assert!(store.recursive_delete(B, "a/").await.is_err());
        assert_eq!(store.keys(B).len(), 5);
    }

    #[tokio::test]
    async fn delete_dispatches_on_recursive_flag() {
        let store = seeded();
        assert_eq!(store.delete(B, "top.txt", false).await.unwrap(), 1);
        assert_eq!(store.delete(B, "a/c/", true).await.unwrap(), 2);
        assert_eq!(store.keys(B), vec!["a/".to_string(), "a/b.txt".to_string()]);
    }

    // -----------------------------------------------------------------------
    // Fault injection
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn faults_fire_once() {
        let store = seeded();
        store.fail_nth_with(Operation::GetData, 1, StoreError::Auth("token expired".into()));
        assert!(store.get_data(B, "top.txt").await.unwrap_err().is_auth());
        assert!(store.get_data(B, "top.txt").await.is_ok());
    }

    #[test]
    fn debug_output() {
        let dbg = format!("{:?}", seeded());
        assert!(dbg.contains("object_count: 5"));
    }
}

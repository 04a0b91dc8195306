//! Object-storage client for the gcsb browser.
//!
//! The [`ObjectStoreClient`] trait is a stateless façade over a bucket's
//! object API: list, get-metadata, get-data, write, delete, and copy, plus
//! the derived composites built from them (move, recursive delete).
//!
//! # Storage Backends
//!
//! - [`HttpObjectStore`] -- the Cloud Storage JSON API over HTTPS
//! - [`InMemoryObjectStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Clients hold no navigation state; every call names its bucket and key.
//! 2. Keys passed to any call are bare keys, never generation-qualified ids.
//! 3. Composite operations run their steps sequentially and stop on the first
//!    failure. Completed steps are never rolled back.
//! 4. Errors are propagated to the caller, never retried here.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use http::HttpObjectStore;
pub use memory::{InMemoryObjectStore, Operation, StoreCall};
pub use traits::{ListOptions, ObjectStoreClient};

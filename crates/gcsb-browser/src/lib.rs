//! Folder projection over a flat, prefix-addressed object store.
//!
//! Object storage has no directories. This crate maps a bucket's
//! `/`-delimited keys onto a navigable folder chain and turns each delimited
//! listing into the flat list of files and pseudo-folders of the current
//! folder.
//!
//! # Components
//!
//! - [`FolderChain`] -- bucket root plus the descended folder segments
//! - [`reconcile`] -- raw listing to [`DisplayEntry`](gcsb_types::DisplayEntry) list
//! - [`FolderProjection`] -- the navigator state machine and its file actions
//! - [`EditorSession`] -- size-guarded load and save of a single object
//!
//! UI collaborators issue commands on a [`FolderProjection`] and subscribe
//! to [`ViewSnapshot`]s and [`SelectionChange`](gcsb_types::SelectionChange)s
//! through `tokio::sync::watch` channels.

pub mod chain;
pub mod config;
pub mod editor;
pub mod error;
pub mod projection;
pub mod reconcile;
pub mod snapshot;

pub use chain::{FolderChain, FolderChainEntry, ROOT_ID};
pub use config::{ActionSet, BrowserConfig, GcsbConfig};
pub use editor::EditorSession;
pub use error::{BrowserError, BrowserResult};
pub use projection::{Download, FolderProjection};
pub use reconcile::reconcile;
pub use snapshot::{FileAction, ViewSnapshot};

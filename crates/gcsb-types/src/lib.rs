//! Foundation types for the gcsb object-storage browser.
//!
//! This crate provides the identifiers, wire records, and derived view types
//! shared by the store client and the folder projection. Every other gcsb
//! crate depends on `gcsb-types`.
//!
//! # Key Types
//!
//! - [`BucketName`] -- validated bucket identifier
//! - [`Credential`] -- opaque bearer token supplied by the auth collaborator
//! - [`ObjectItem`] / [`ListResult`] -- raw entries returned by a listing
//! - [`ObjectMetadata`] -- metadata of a single object
//! - [`DisplayEntry`] -- one navigable file or pseudo-folder in the current view
//! - [`Selection`] / [`SelectionChange`] -- selected entry ids and their projection
//!
//! The [`key`] module holds the pure path helpers (`to_path`, basename,
//! parent prefix) that every listing passes through.

pub mod bucket;
pub mod credential;
pub mod entry;
pub mod error;
pub mod key;
pub mod selection;

pub use bucket::BucketName;
pub use credential::Credential;
pub use entry::{BucketInfo, DisplayEntry, ListResult, ObjectItem, ObjectMetadata};
pub use error::TypeError;
pub use key::{basename, folder_key, is_folder_key, parent_prefix, to_path, validate_name};
pub use selection::{Selection, SelectionChange};

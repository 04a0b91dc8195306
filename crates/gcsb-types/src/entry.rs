//! Wire records returned by the object-storage JSON API and the display
//! entries derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::key::{basename, is_folder_key, to_path};

/// One object returned by a listing (`items[]`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectItem {
    /// Full object key.
    pub name: String,
    /// Size in bytes. The JSON API encodes it as a decimal string.
    #[serde(with = "string_u64", default)]
    pub size: u64,
    /// Last-modified timestamp.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    /// Generation-qualified id: `{bucket}/{key}/{generation}`.
    pub id: String,
}

/// Result of a single listing call.
///
/// Both fields are omitted by the API when empty; they deserialize to empty
/// vectors here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ObjectItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ListResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.prefixes.is_empty()
    }

    /// Append another page to this result.
    pub fn extend(&mut self, page: ListResult) {
        self.items.extend(page.items);
        self.prefixes.extend(page.prefixes);
        self.next_page_token = page.next_page_token;
    }
}

/// Metadata of a single object (`GET /b/{bucket}/o/{object}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub name: String,
    pub bucket: String,
    #[serde(with = "string_u64", default)]
    pub size: u64,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(with = "string_u64", default)]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub id: String,
}

/// One bucket returned by `GET /b?project=`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<DateTime<Utc>>,
}

/// A navigable entry of the current folder: a file or a pseudo-folder.
///
/// Display entries are recomputed from scratch on every listing refresh and
/// are never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    /// Full key (files, marker folders) or common prefix (folders).
    pub id: String,
    /// Basename without any trailing `/`.
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl DisplayEntry {
    /// Build an entry from a listed object. Marker objects (keys ending in
    /// `/`) become folders.
    pub fn from_item(bucket: &str, item: &ObjectItem) -> Self {
        Self {
            id: to_path(bucket, &item.id),
            name: basename(&item.name).to_string(),
            is_dir: is_folder_key(&item.name),
            size: item.size,
            modified: item.updated,
        }
    }

    /// Build a folder entry from a common prefix.
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            id: prefix.to_string(),
            name: basename(prefix).to_string(),
            is_dir: true,
            size: 0,
            modified: None,
        }
    }

    /// Key this entry reconstructs when joined to `prefix`.
    pub fn key_under(&self, prefix: &str) -> String {
        if self.is_dir {
            format!("{prefix}{}/", self.name)
        } else {
            format!("{prefix}{}", self.name)
        }
    }
}

/// Decimal-string encoding for 64-bit integers, accepting plain JSON numbers
/// on input as well.
mod string_u64 {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Ok(n),
            StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

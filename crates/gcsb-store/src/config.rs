use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the JSON API backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the object API.
    pub api_base: String,
    /// Base URL of the media upload API.
    pub upload_base: String,
    /// Per-request timeout applied by the HTTP client. `None` leaves the
    /// client's own behavior in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Project used when listing buckets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Page size requested from listing calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base: "https://storage.googleapis.com/storage/v1".into(),
            upload_base: "https://storage.googleapis.com/upload/storage/v1".into(),
            timeout_secs: None,
            project: None,
            page_size: None,
        }
    }
}

impl StoreConfig {
    /// Configuration pointing both API bases at a single endpoint root, as
    /// used by emulators and test servers.
    pub fn with_endpoint(endpoint: &str) -> Self {
        let root = endpoint.trim_end_matches('/');
        Self {
            api_base: format!("{root}/storage/v1"),
            upload_base: format!("{root}/upload/storage/v1"),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

use gcsb_store::StoreError;
use gcsb_types::TypeError;
use thiserror::Error;

use crate::snapshot::FileAction;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// A local precondition failed. No request was issued.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("action disabled: {0}")]
    ActionDisabled(FileAction),

    #[error("nothing selected")]
    NoSelection,

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("object too large for inline editing: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("object is not UTF-8 text: {0}")]
    NotText(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl BrowserError {
    /// Returns `true` for failures rejected before any network call.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::NotText(_))
    }

    /// The underlying store error, if this failure came from the store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TypeError> for BrowserError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type BrowserResult<T> = Result<T, BrowserError>;

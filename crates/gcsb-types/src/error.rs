use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("bucket name must not be empty")]
    EmptyBucketName,

    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("invalid object name {name:?}: {reason}")]
    InvalidObjectName { name: String, reason: String },
}

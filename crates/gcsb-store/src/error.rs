use gcsb_types::TypeError;

/// Errors from object store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Missing, expired, or rejected credential. Never retried.
    #[error("authorization failed: {0}")]
    Auth(String),

    /// The target object does not exist.
    #[error("object not found: gs://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The bucket does not exist or is not visible to the caller.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// The API rejected the request. The message is passed through verbatim.
    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response (connection, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A local precondition failed before any request was issued.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BucketNotFound(_))
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e = StoreError::not_found("b", "x/y.txt");
        assert_eq!(e.to_string(), "object not found: gs://b/x/y.txt");

        let e = StoreError::Api {
            status: 429,
            message: "rate limit exceeded".into(),
        };
        assert_eq!(e.to_string(), "storage API error (429): rate limit exceeded");
    }

    #[test]
    fn classification() {
        assert!(StoreError::Auth("expired".into()).is_auth());
        assert!(StoreError::not_found("b", "k").is_not_found());
        assert!(StoreError::BucketNotFound("b".into()).is_not_found());
        assert!(!StoreError::Transport("reset".into()).is_not_found());
    }

    #[test]
    fn type_errors_become_validation() {
        let e: StoreError = TypeError::EmptyBucketName.into();
        assert!(matches!(e, StoreError::Validation(_)));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A validated bucket name.
///
/// Only the constraints the browser relies on are enforced: the name is
/// non-empty and contains no `/`, so it can be joined into request paths
/// and stripped from generation-qualified ids unambiguously.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Parse and validate a bucket name.
    pub fn parse(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::EmptyBucketName);
        }
        if name.contains('/') {
            return Err(TypeError::InvalidBucketName {
                name,
                reason: "must not contain '/'".into(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidBucketName {
                name,
                reason: "must not contain whitespace".into(),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketName({})", self.0)
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BucketName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BucketName> for String {
    fn from(value: BucketName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid() {
        let b = BucketName::parse("my-bucket").unwrap();
        assert_eq!(b.as_str(), "my-bucket");
        assert_eq!(b.to_string(), "my-bucket");
    }

    #[test]
    fn reject_empty() {
        assert_eq!(BucketName::parse(""), Err(TypeError::EmptyBucketName));
    }

    #[test]
    fn reject_slash_and_whitespace() {
        assert!(BucketName::parse("a/b").is_err());
        assert!(BucketName::parse("a b").is_err());
    }

    #[test]
    fn serde_validates() {
        let ok: BucketName = serde_json::from_str("\"photos\"").unwrap();
        assert_eq!(ok.as_str(), "photos");
        assert!(serde_json::from_str::<BucketName>("\"\"").is_err());
    }
}

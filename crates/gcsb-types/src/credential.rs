use std::fmt;

/// Bearer credential supplied by the external auth collaborator.
///
/// The core never mutates a credential. It only checks that a token is
/// present before attaching it to a request; expiry and revocation surface
/// as authorization failures from the HTTP layer.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: Option<String>,
    error: Option<String>,
}

impl Credential {
    /// A credential carrying an access token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            error: None,
        }
    }

    /// A credential whose acquisition failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            token: None,
            error: Some(error.into()),
        }
    }

    /// No credential at all (anonymous access).
    pub fn none() -> Self {
        Self {
            token: None,
            error: None,
        }
    }

    /// The bearer token, if acquisition succeeded and it is non-empty.
    pub fn token(&self) -> Option<&str> {
        match (&self.token, &self.error) {
            (Some(t), None) if !t.is_empty() => Some(t),
            _ => None,
        }
    }

    /// The acquisition error reported by the auth collaborator.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns `true` if a usable token is present.
    pub fn is_valid(&self) -> bool {
        self.token().is_some()
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("error", &self.error)
            .finish()
    }
}

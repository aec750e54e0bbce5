//! Bearer credentials attached to protected calls.

/// Credentials for one outbound request.
///
/// Produced by [`crate::session::SessionStore::authorize`]; empty when no
/// one is signed in, in which case applying it is a no-op.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Authorization {
    bearer: Option<String>,
}

impl Authorization {
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Attach `Authorization: Bearer <token>` to the request, if a token is present.
    #[must_use]
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

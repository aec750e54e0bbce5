//! Operation-level error taxonomy surfaced to the renderer.

use thiserror::Error;

use crate::api::ApiError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) const NETWORK_FALLBACK: &str = "A network error occurred. Please try again.";
pub(crate) const SERVER_FALLBACK: &str = "Something went wrong. Please try again.";
pub(crate) const INVALID_CREDENTIALS: &str = "Email or password is incorrect.";
pub(crate) const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";
pub(crate) const NOT_SIGNED_IN: &str = "You are not signed in.";

/// Client-side input problems, reported without any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message cannot be empty.")]
    EmptyMessage,

    #[error("Email cannot be empty.")]
    EmptyEmail,

    #[error("Select or start a conversation first.")]
    NoConversation,

    #[error("Password must be at least {min} characters.")]
    PasswordTooShort { min: usize },

    #[error("Passwords do not match.")]
    PasswordMismatch,
}

/// Failure of a directory, timeline or session operation.
///
/// `Display` yields the human-readable text the renderer shows in its
/// error slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid credentials, or a protected call rejected with 401.
    #[error("{message}")]
    Auth { message: String },

    /// Transport failure, no response.
    #[error("{message}")]
    Network { message: String },

    /// The backend answered 4xx/5xx.
    #[error("{message}")]
    Application { status: Option<u16>, message: String },

    /// Creating a conversation failed; no local state changed.
    #[error("Could not start a new conversation: {0}")]
    Creation(Box<ClientError>),

    /// The assistant reply never arrived; the optimistic message was rolled back.
    #[error("Could not get a response from the assistant: {0}")]
    AiResponse(Box<ClientError>),

    /// A send is already in flight for this conversation.
    #[error("A message is already being sent.")]
    SendInProgress,

    /// The call resolved after the session it was issued under ended.
    /// Its result was dropped; nothing is shown for it.
    #[error("The session ended before the request completed.")]
    SessionEnded,
}

impl ClientError {
    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Classify a transport error from a protected call.
    pub(crate) fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::Network(_) => Self::Network {
                message: NETWORK_FALLBACK.to_string(),
            },
            ApiError::Unauthorized { message } => Self::Auth {
                message: message.unwrap_or_else(|| SESSION_EXPIRED.to_string()),
            },
            ApiError::Api { status, message } => Self::Application {
                status: Some(status),
                message: message.unwrap_or_else(|| SERVER_FALLBACK.to_string()),
            },
            ApiError::Decode(_) | ApiError::InvalidUrl(_) => Self::Application {
                status: None,
                message: SERVER_FALLBACK.to_string(),
            },
        }
    }

    /// Classify a failure from an unauthenticated account call.
    ///
    /// Any answer from the backend is shown verbatim (or `fallback`); no
    /// answer at all is a network error.
    pub(crate) fn from_account_api(err: &ApiError, fallback: &str) -> Self {
        if !err.has_response() {
            return Self::Network {
                message: NETWORK_FALLBACK.to_string(),
            };
        }
        let message = err.server_message().unwrap_or(fallback).to_string();
        match err {
            ApiError::Unauthorized { .. } => Self::Auth { message },
            ApiError::Api { status, .. } => Self::Application {
                status: Some(*status),
                message,
            },
            _ => Self::Application {
                status: None,
                message,
            },
        }
    }

    /// Whether this error (or the one it wraps) is an authentication failure.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth { .. } => true,
            Self::Creation(inner) | Self::AiResponse(inner) => inner.is_auth(),
            _ => false,
        }
    }

    /// Whether the renderer should show this error at all.
    #[must_use]
    pub fn is_displayable(&self) -> bool {
        !matches!(self, Self::SessionEnded)
    }
}

/// Check a new password and its confirmation.
pub fn validate_new_password(
    password: &str,
    confirm: &str,
) -> std::result::Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

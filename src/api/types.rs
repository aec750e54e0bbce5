//! Wire types for the backend REST API.
//!
//! Field names follow the backend's camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ConversationId, Message, MessageId, MessageStatus, Role};

// =============================================================================
// Auth API Types
// =============================================================================

/// Body of `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Response from `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for protected calls.
    pub token: String,
    /// Identity of the signed-in user.
    pub email: String,
}

/// Response from `POST /auth/register`.
///
/// The backend sends a user/token payload whose exact shape varies, so every
/// field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /auth/forgot-password`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body of `POST /auth/reset-password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned alongside 4xx/5xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Chat API Types
// =============================================================================

/// Body of `POST /chat/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: ConversationId,
    pub content: String,
}

/// A message as the backend sends it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: MessageId,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, deserialize_with = "crate::model::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MessageDto {
    /// Convert into a committed timeline message.
    ///
    /// `conversation_id` is used when the backend omits the field.
    #[must_use]
    pub fn into_message(self, conversation_id: &ConversationId) -> Message {
        Message {
            id: self.id,
            conversation_id: self
                .conversation_id
                .unwrap_or_else(|| conversation_id.clone()),
            role: self.role,
            content: self.content,
            status: MessageStatus::Committed,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_uses_camel_case() {
        let body = serde_json::to_value(SendMessageRequest {
            conversation_id: ConversationId::new("1"),
            content: "hi".into(),
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"conversationId": "1", "content": "hi"}));
    }

    #[test]
    fn reset_request_uses_camel_case() {
        let body = serde_json::to_value(ResetPasswordRequest {
            token: "t".into(),
            new_password: "longenough".into(),
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"token": "t", "newPassword": "longenough"}));
    }

    #[test]
    fn message_dto_falls_back_to_requested_conversation() {
        let dto: MessageDto =
            serde_json::from_str(r#"{"id":42,"role":"model","content":"hello"}"#).unwrap();
        let message = dto.into_message(&ConversationId::new("5"));

        assert_eq!(message.id, MessageId::Remote("42".into()));
        assert_eq!(message.conversation_id.as_str(), "5");
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.status, MessageStatus::Committed);
    }

    #[test]
    fn message_list_with_unknown_role_still_decodes() {
        let list: Vec<MessageDto> = serde_json::from_str(
            r#"[{"id":1,"role":"system","content":"be brief"},{"id":2,"role":"user","content":"hi","createdAt":1714557600000}]"#,
        )
        .unwrap();

        assert_eq!(list[0].role, Role::Other);
        assert_eq!(list[1].role, Role::User);
        assert_eq!(list[1].created_at, None);
    }
}

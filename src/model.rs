//! Domain model shared by the directory, the timeline and the renderer.
//!
//! Identifiers are opaque: the backend may send them as JSON numbers or
//! strings, and they are kept as strings locally. Messages created on this
//! client carry a [`MessageId::Local`] identifier that is never reused.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque conversation identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for ConversationId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ConversationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        OpaqueId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
    }
}

/// Message identifier: client-assigned for locally created messages,
/// backend-assigned for everything fetched or returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Assigned by this client; unique for the lifetime of the timeline.
    Local(u64),
    /// Assigned by the backend.
    Remote(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(n) => write!(f, "local-{n}"),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        OpaqueId::deserialize(deserializer).map(|raw| Self::Remote(raw.into_string()))
    }
}

/// Wire form of an id: numeric or textual.
#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueId {
    Number(i64),
    Text(String),
}

impl OpaqueId {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// A named thread of messages between the user and the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    #[must_use]
    pub fn new(id: impl Into<ConversationId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: None,
            updated_at: None,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// The backend labels replies either `assistant` or `model`.
    #[serde(alias = "model")]
    Assistant,
    /// Any other label (`system`, tool output, ...). Not shown in the timeline.
    #[serde(other)]
    Other,
}

/// Delivery state of a message in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Shown optimistically; the backend has not acknowledged it yet.
    Pending,
    /// Acknowledged by the backend.
    Committed,
}

/// A single message in a conversation timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Build a user message that has not been acknowledged yet.
    #[must_use]
    pub fn pending_user(
        local_id: u64,
        conversation_id: ConversationId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::Local(local_id),
            conversation_id,
            role: Role::User,
            content: content.into(),
            status: MessageStatus::Pending,
            created_at: Some(Utc::now()),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Renderer colour scheme, persisted alongside the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Parse a stored value; anything unrecognised falls back to light.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamps
// ─────────────────────────────────────────────────────────────────────────────

/// Accept RFC 3339 timestamps as well as zone-less `LocalDateTime` strings,
/// which are read as UTC. Unparseable values, including non-string JSON,
/// become `None`.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(value)) => parse_timestamp(&value),
        _ => None,
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_accepts_numeric_and_string_ids() {
        let numeric: Conversation = serde_json::from_str(r#"{"id":1,"title":"New"}"#).unwrap();
        let text: Conversation = serde_json::from_str(r#"{"id":"abc","title":"Other"}"#).unwrap();

        assert_eq!(numeric.id, ConversationId::from(1_u64));
        assert_eq!(text.id.as_str(), "abc");
    }

    #[test]
    fn conversation_timestamps_are_lenient() {
        let conv: Conversation = serde_json::from_str(
            r#"{"id":7,"title":"t","createdAt":"2024-05-01T10:00:00","updatedAt":"not a date"}"#,
        )
        .unwrap();

        assert_eq!(
            conv.created_at.map(|t| t.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );
        assert!(conv.updated_at.is_none());
    }

    #[test]
    fn non_string_timestamps_become_none() {
        let conv: Conversation = serde_json::from_str(
            r#"{"id":1,"title":"t","createdAt":1714557600000,"updatedAt":[2024,5,1,10,0]}"#,
        )
        .unwrap();

        assert_eq!(conv.title, "t");
        assert!(conv.created_at.is_none());
        assert!(conv.updated_at.is_none());
    }

    #[test]
    fn model_role_is_an_assistant() {
        let role: Role = serde_json::from_str(r#""model""#).unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn unknown_roles_decode_as_other() {
        let role: Role = serde_json::from_str(r#""system""#).unwrap();
        assert_eq!(role, Role::Other);
    }

    #[test]
    fn local_ids_render_with_prefix() {
        assert_eq!(MessageId::Local(3).to_string(), "local-3");
        assert_eq!(MessageId::Remote("9".into()).to_string(), "9");
    }

    #[test]
    fn theme_round_trips_through_storage_strings() {
        assert_eq!(Theme::parse(Theme::Dark.as_str()), Theme::Dark);
        assert_eq!(Theme::parse("garbage"), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }
}

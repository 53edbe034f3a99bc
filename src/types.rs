use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = String;
pub type ConversationId = String;
pub type MessageId = String;

/// Longest preview kept on a conversation summary, in characters.
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Prefix for records created locally while the remote store was unreachable.
pub const TEMP_ID_PREFIX: &str = "temp_";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: u64,
    pub last_message_preview: String,
}

impl ConversationSummary {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            updated_at: Utc::now(),
            message_count: 0,
            last_message_preview: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Conversation,
    Message,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub kind: HitKind,
    pub conversation_id: ConversationId,
    pub message_id: Option<MessageId>,
    pub snippet: String,
    pub score: f64,
}

/// One page of an ordered listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new(), has_more: false, next_cursor: None, total_count: None }
    }
}

/// Where a read was ultimately served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Optimized,
    Legacy,
    Remote,
    Mirror,
    /// Every tier failed; the value is an empty default.
    Unavailable,
}

impl Source {
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Mirror | Self::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Fetched<T> {
    #[must_use]
    pub const fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched { value: f(self.value), source: self.source }
    }
}

/// Outcome of a write. `confirmed` is false when only the local mirror was updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    pub record: T,
    pub confirmed: bool,
}

#[must_use]
pub fn temporary_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

#[must_use]
pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Truncate message content to a summary preview on a char boundary.
#[must_use]
pub fn preview_of(content: &str) -> String {
    content.chars().take(PREVIEW_MAX_CHARS).collect()
}

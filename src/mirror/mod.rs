//! Best-effort offline copy of the last data seen from the remote store.
//!
//! One record per user holds the conversation list; one independent record per
//! conversation holds its most recent messages.
mod file;
mod local;
mod memory;

pub use file::FileMirror;
pub use local::{LocalMirror, MirrorConfig};
pub use memory::MemoryMirror;

use crate::errors::DataError;
use crate::types::{ConversationSummary, MessageRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub conversation_id: String,
    pub messages: Vec<MessageRecord>,
}

/// Raw record storage behind [`LocalMirror`].
pub trait MirrorStore: Send + Sync {
    /// # Errors
    /// `DataError::Mirror`, `DataError::Io` or `DataError::Json` on storage failure.
    fn load_user(&self, user_id: &str) -> Result<Option<UserSnapshot>, DataError>;
    /// # Errors
    /// As for `load_user`.
    fn save_user(&self, snapshot: &UserSnapshot) -> Result<(), DataError>;
    /// # Errors
    /// As for `load_user`.
    fn remove_user(&self, user_id: &str) -> Result<bool, DataError>;
    /// # Errors
    /// As for `load_user`.
    fn load_messages(&self, conversation_id: &str) -> Result<Option<MessageSnapshot>, DataError>;
    /// # Errors
    /// As for `load_user`.
    fn save_messages(&self, snapshot: &MessageSnapshot) -> Result<(), DataError>;
    /// # Errors
    /// As for `load_user`.
    fn remove_messages(&self, conversation_id: &str) -> Result<bool, DataError>;
}

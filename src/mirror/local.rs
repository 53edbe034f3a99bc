use crate::errors::DataError;
use crate::mirror::{MessageSnapshot, MirrorStore, UserSnapshot};
use crate::types::{ConversationSummary, HitKind, MessageRecord, SearchHit, preview_of};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MirrorConfig {
    /// Directory for a file-backed mirror; `None` keeps the mirror in memory.
    pub dir: Option<PathBuf>,
    pub max_messages_per_conversation: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self { dir: None, max_messages_per_conversation: 100 }
    }
}

/// Conversation-level operations over a [`MirrorStore`].
///
/// Every load-modify-save sequence runs under one lock shared by all clones, so concurrent
/// mutations through a cloned facade never overwrite each other.
#[derive(Clone)]
pub struct LocalMirror {
    store: Arc<dyn MirrorStore>,
    max_messages: usize,
    writes: Arc<Mutex<()>>,
}

impl std::fmt::Debug for LocalMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalMirror").field("max_messages", &self.max_messages).finish_non_exhaustive()
    }
}

impl LocalMirror {
    #[must_use]
    pub fn new(store: Arc<dyn MirrorStore>, config: &MirrorConfig) -> Self {
        Self { store, max_messages: config.max_messages_per_conversation.max(1), writes: Arc::new(Mutex::new(())) }
    }

    /// The user's mirrored conversation list, or `None` when nothing was ever mirrored.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn conversations(&self, user_id: &str) -> Result<Option<Vec<ConversationSummary>>, DataError> {
        Ok(self.store.load_user(user_id)?.map(|s| s.conversations))
    }

    /// # Errors
    /// Propagates storage errors.
    pub fn snapshot(&self, user_id: &str) -> Result<Option<UserSnapshot>, DataError> {
        self.store.load_user(user_id)
    }

    /// Replaces the user's mirrored list.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn store_conversations(&self, user_id: &str, conversations: &[ConversationSummary]) -> Result<(), DataError> {
        let _writes = self.writes.lock();
        self.save_list(user_id, conversations)
    }

    fn save_list(&self, user_id: &str, conversations: &[ConversationSummary]) -> Result<(), DataError> {
        self.store.save_user(&UserSnapshot {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            conversations: conversations.to_vec(),
        })
    }

    /// Mirrored messages, oldest first.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn messages(&self, conversation_id: &str) -> Result<Option<Vec<MessageRecord>>, DataError> {
        Ok(self.store.load_messages(conversation_id)?.map(|s| s.messages))
    }

    /// Stores the newest `max_messages` of `messages`, oldest first.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn store_messages(&self, conversation_id: &str, messages: &[MessageRecord]) -> Result<(), DataError> {
        let _writes = self.writes.lock();
        self.save_capped(conversation_id, messages)
    }

    fn save_capped(&self, conversation_id: &str, messages: &[MessageRecord]) -> Result<(), DataError> {
        let mut sorted = messages.to_vec();
        sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let skip = sorted.len().saturating_sub(self.max_messages);
        sorted.drain(..skip);
        self.store.save_messages(&MessageSnapshot { conversation_id: conversation_id.to_string(), messages: sorted })
    }

    /// Splices one remotely paged window into the mirrored list at `offset`.
    ///
    /// Entries with the same ids are replaced. A window shorter than `limit` marks the end
    /// of the remote list, so anything mirrored after it is dropped.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn merge_conversations(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
        window: &[ConversationSummary],
    ) -> Result<(), DataError> {
        let _writes = self.writes.lock();
        let mut list = self.conversations(user_id)?.unwrap_or_default();
        list.retain(|c| !window.iter().any(|w| w.id == c.id));
        let at = offset.min(list.len());
        list.splice(at..at, window.iter().cloned());
        if window.len() < limit {
            list.truncate(at + window.len());
        }
        self.save_list(user_id, &list)
    }

    /// Puts `summary` at the front of the user's list, replacing any entry with the same id.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn upsert_conversation(&self, user_id: &str, summary: &ConversationSummary) -> Result<(), DataError> {
        let _writes = self.writes.lock();
        let mut list = self.conversations(user_id)?.unwrap_or_default();
        list.retain(|c| c.id != summary.id);
        list.insert(0, summary.clone());
        self.save_list(user_id, &list)
    }

    /// Appends `message` and refreshes the owning summary's count, preview and ordering.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn append_message(&self, user_id: &str, message: &MessageRecord) -> Result<(), DataError> {
        let _writes = self.writes.lock();
        let mut messages = self.messages(&message.conversation_id)?.unwrap_or_default();
        messages.push(message.clone());
        self.save_capped(&message.conversation_id, &messages)?;

        let mut list = self.conversations(user_id)?.unwrap_or_default();
        if let Some(pos) = list.iter().position(|c| c.id == message.conversation_id) {
            let mut summary = list.remove(pos);
            summary.message_count += 1;
            summary.last_message_preview = preview_of(&message.content);
            summary.updated_at = message.created_at;
            list.insert(0, summary);
            self.save_list(user_id, &list)?;
        }
        Ok(())
    }

    /// Drops the conversation from the user's list and deletes its messages.
    /// Returns whether the list contained it.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn remove_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool, DataError> {
        let _writes = self.writes.lock();
        let mut found = false;
        if let Some(mut list) = self.conversations(user_id)? {
            let before = list.len();
            list.retain(|c| c.id != conversation_id);
            found = list.len() != before;
            if found {
                self.save_list(user_id, &list)?;
            }
        }
        self.store.remove_messages(conversation_id)?;
        Ok(found)
    }

    /// Drops every mirrored record for the user.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn clear_user(&self, user_id: &str) -> Result<usize, DataError> {
        let _writes = self.writes.lock();
        let Some(list) = self.conversations(user_id)? else { return Ok(0) };
        for c in &list {
            self.store.remove_messages(&c.id)?;
        }
        self.store.remove_user(user_id)?;
        Ok(list.len())
    }

    /// Case-insensitive substring search over titles, previews and mirrored messages.
    ///
    /// # Errors
    /// Propagates storage errors.
    pub fn search(&self, user_id: &str, term: &str, limit: usize) -> Result<Vec<SearchHit>, DataError> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits = Vec::new();
        for c in self.conversations(user_id)?.unwrap_or_default() {
            if c.title.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: HitKind::Conversation,
                    conversation_id: c.id.clone(),
                    message_id: None,
                    snippet: c.title.clone(),
                    score: 1.0,
                });
            } else if c.last_message_preview.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: HitKind::Conversation,
                    conversation_id: c.id.clone(),
                    message_id: None,
                    snippet: c.last_message_preview.clone(),
                    score: 0.8,
                });
            }
            for m in self.messages(&c.id)?.unwrap_or_default().iter().rev() {
                if m.content.to_lowercase().contains(&needle) {
                    hits.push(SearchHit {
                        kind: HitKind::Message,
                        conversation_id: c.id.clone(),
                        message_id: Some(m.id.clone()),
                        snippet: preview_of(&m.content),
                        score: 0.5,
                    });
                }
            }
        }
        // stable: equal scores keep list order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

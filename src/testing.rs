//! In-process [`RemoteStore`] double whose tiers can be told to fail, hang or succeed.
//!
//! Used by the crate's own tests and by applications exercising their offline paths.

use crate::errors::DataError;
use crate::remote::RemoteStore;
use crate::types::{ConversationSummary, HitKind, MessageRecord, Role, SearchHit, preview_of};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// One remote operation, for failure switches and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Optimized,
    Legacy,
    Messages,
    Search,
    Create,
    AddMessage,
    Delete,
    ForceDelete,
    AdminDelete,
    Health,
}

#[derive(Debug, Default)]
pub struct ScriptedRemote {
    conversations: Mutex<HashMap<String, Vec<ConversationSummary>>>,
    messages: Mutex<HashMap<String, Vec<MessageRecord>>>,
    failing: Mutex<HashSet<Op>>,
    calls: Mutex<HashMap<Op, usize>>,
    unhealthy: AtomicBool,
    delay_ms: AtomicU64,
    next_id: AtomicU64,
}

impl ScriptedRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_conversations(self, user_id: &str, list: Vec<ConversationSummary>) -> Self {
        self.conversations.lock().insert(user_id.to_string(), list);
        self
    }

    #[must_use]
    pub fn with_messages(self, conversation_id: &str, list: Vec<MessageRecord>) -> Self {
        self.messages.lock().insert(conversation_id.to_string(), list);
        self
    }

    /// Makes `op` fail with `DataError::Remote` (or recover when `failing` is false).
    pub fn fail(&self, op: Op, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    pub fn fail_all_reads(&self) {
        for op in [Op::Optimized, Op::Legacy, Op::Messages, Op::Search] {
            self.fail(op, true);
        }
    }

    pub fn fail_all_writes(&self) {
        for op in [Op::Create, Op::AddMessage, Op::Delete, Op::ForceDelete, Op::AdminDelete] {
            self.fail(op, true);
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Delays every call by `delay`, e.g. to trip deadlines.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(crate::utils::num::u128_to_u64_saturating(delay.as_millis()), Ordering::SeqCst);
    }

    #[must_use]
    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn stored_conversations(&self, user_id: &str) -> Vec<ConversationSummary> {
        self.conversations.lock().get(user_id).cloned().unwrap_or_default()
    }

    async fn enter(&self, op: Op) -> Result<(), DataError> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.lock().contains(&op) {
            return Err(DataError::Remote(format!("{op:?} unavailable")));
        }
        Ok(())
    }

    fn sorted(&self, user_id: &str) -> Vec<ConversationSummary> {
        let mut list = self.stored_conversations(user_id);
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list
    }

    fn remove(&self, id: &str, user_id: &str) -> bool {
        let mut all = self.conversations.lock();
        let Some(list) = all.get_mut(user_id) else { return false };
        let before = list.len();
        list.retain(|c| c.id != id);
        let removed = list.len() != before;
        if removed {
            self.messages.lock().remove(id);
        }
        removed
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn fetch_conversations_optimized(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConversationSummary>, DataError> {
        self.enter(Op::Optimized).await?;
        Ok(self.sorted(user_id).into_iter().skip(offset).take(limit).collect())
    }

    async fn fetch_conversations_legacy(&self, user_id: &str) -> Result<Vec<ConversationSummary>, DataError> {
        self.enter(Op::Legacy).await?;
        Ok(self.sorted(user_id))
    }

    async fn fetch_messages(&self, conversation_id: &str, _user_id: &str) -> Result<Vec<MessageRecord>, DataError> {
        self.enter(Op::Messages).await?;
        Ok(self.messages.lock().get(conversation_id).cloned().unwrap_or_default())
    }

    async fn search_conversations_and_messages(
        &self,
        user_id: &str,
        term: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, DataError> {
        self.enter(Op::Search).await?;
        let needle = term.to_lowercase();
        let conversations = self.sorted(user_id);
        let messages = self.messages.lock();
        let mut hits = Vec::new();
        for c in conversations {
            if c.title.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: HitKind::Conversation,
                    conversation_id: c.id.clone(),
                    message_id: None,
                    snippet: c.title.clone(),
                    score: 1.0,
                });
            }
            for m in messages.get(&c.id).into_iter().flatten() {
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
        hits.truncate(limit);
        Ok(hits)
    }

    async fn create_conversation(&self, title: &str, user_id: &str) -> Result<ConversationSummary, DataError> {
        self.enter(Op::Create).await?;
        let id = format!("conv_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let summary = ConversationSummary::new(id, title);
        self.conversations.lock().entry(user_id.to_string()).or_default().insert(0, summary.clone());
        Ok(summary)
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<MessageRecord, DataError> {
        self.enter(Op::AddMessage).await?;
        let record = MessageRecord {
            id: format!("msg_{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
            metadata,
        };
        self.messages.lock().entry(conversation_id.to_string()).or_default().push(record.clone());
        for list in self.conversations.lock().values_mut() {
            if let Some(c) = list.iter_mut().find(|c| c.id == conversation_id) {
                c.message_count += 1;
                c.last_message_preview = preview_of(content);
                c.updated_at = record.created_at;
            }
        }
        Ok(record)
    }

    async fn delete_conversation(&self, id: &str, user_id: &str) -> Result<bool, DataError> {
        self.enter(Op::Delete).await?;
        Ok(self.remove(id, user_id))
    }

    async fn force_delete_conversation(&self, id: &str, user_id: &str) -> Result<bool, DataError> {
        self.enter(Op::ForceDelete).await?;
        Ok(self.remove(id, user_id))
    }

    async fn admin_delete_conversation(&self, id: &str, user_id: &str) -> Result<bool, DataError> {
        self.enter(Op::AdminDelete).await?;
        Ok(self.remove(id, user_id))
    }

    async fn health_check(&self) -> bool {
        self.enter(Op::Health).await.is_ok() && !self.unhealthy.load(Ordering::SeqCst)
    }
}

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default()
}

/// `n` conversations `c0..c{n-1}`, `c0` most recently updated.
#[must_use]
pub fn sample_conversations(n: usize) -> Vec<ConversationSummary> {
    (0..n)
        .map(|i| {
            let mut c = ConversationSummary::new(format!("c{i}"), format!("Conversation {i}"));
            let age = i64::try_from(i).unwrap_or(i64::MAX);
            c.updated_at = epoch() - ChronoDuration::minutes(age);
            c.message_count = 1;
            c.last_message_preview = format!("last words of {i}");
            c
        })
        .collect()
}

/// `n` messages `m0..m{n-1}` one second apart, `m0` oldest.
#[must_use]
pub fn sample_messages(conversation_id: &str, n: usize) -> Vec<MessageRecord> {
    (0..n)
        .map(|i| {
            let step = i64::try_from(i).unwrap_or(i64::MAX);
            MessageRecord {
                id: format!("m{i}"),
                conversation_id: conversation_id.to_string(),
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("message number {i}"),
                created_at: epoch() + ChronoDuration::seconds(step),
                metadata: None,
            }
        })
        .collect()
}

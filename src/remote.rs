//! Interface to the hosted conversation store.
//!
//! Implementations live outside this crate (HTTP/RPC clients). Every call made through the
//! data layer is wrapped in [`with_deadline`], so an implementation that hangs is treated
//! exactly like one that fails.

use crate::errors::DataError;
use crate::types::{ConversationSummary, MessageRecord, Role, SearchHit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Single batched query: conversations with aggregated stats, paged server-side.
    async fn fetch_conversations_optimized(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConversationSummary>, DataError>;

    /// Per-conversation queries for last message and count; returns the full list.
    async fn fetch_conversations_legacy(&self, user_id: &str) -> Result<Vec<ConversationSummary>, DataError>;

    /// Every message of a conversation, in any order.
    async fn fetch_messages(&self, conversation_id: &str, user_id: &str) -> Result<Vec<MessageRecord>, DataError>;

    async fn search_conversations_and_messages(
        &self,
        user_id: &str,
        term: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, DataError>;

    async fn create_conversation(&self, title: &str, user_id: &str) -> Result<ConversationSummary, DataError>;

    async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<MessageRecord, DataError>;

    /// Plain delete under the caller's own authorization.
    async fn delete_conversation(&self, id: &str, user_id: &str) -> Result<bool, DataError>;

    /// Privileged "force delete" procedure.
    async fn force_delete_conversation(&self, id: &str, user_id: &str) -> Result<bool, DataError>;

    /// Secondary privileged procedure, tried last.
    async fn admin_delete_conversation(&self, id: &str, user_id: &str) -> Result<bool, DataError>;

    async fn health_check(&self) -> bool;
}

/// Per-call deadlines and the knobs for the optimized path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub health_timeout_ms: u64,
    /// How long a health-check result is trusted.
    pub health_ttl_ms: u64,
    /// Rows per optimized call when the full list is assembled from consecutive windows.
    pub optimized_fetch_limit: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 10_000,
            write_timeout_ms: 15_000,
            health_timeout_ms: 3_000,
            health_ttl_ms: 30_000,
            optimized_fetch_limit: 1_000,
        }
    }
}

impl RemoteConfig {
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    #[must_use]
    pub const fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// # Errors
    /// Returns `DataError::Configuration` for zero timeouts or a zero fetch limit.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.read_timeout_ms == 0 || self.write_timeout_ms == 0 || self.health_timeout_ms == 0 {
            return Err(DataError::Configuration("remote timeouts must be positive".into()));
        }
        if self.optimized_fetch_limit == 0 {
            return Err(DataError::Configuration("optimized_fetch_limit must be positive".into()));
        }
        Ok(())
    }
}

/// Runs `fut` with a deadline; elapsing maps to `DataError::Timeout`.
///
/// # Errors
/// Whatever `fut` returns, or `DataError::Timeout`.
pub async fn with_deadline<T, F>(operation: &str, after: Duration, fut: F) -> Result<T, DataError>
where
    F: Future<Output = Result<T, DataError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(res) => res,
        Err(_) => Err(DataError::Timeout {
            operation: operation.to_string(),
            after_ms: crate::utils::num::u128_to_u64_saturating(after.as_millis()),
        }),
    }
}

use crate::errors::DataError;
use crate::mirror::LocalMirror;
use crate::pagination::PageSource;
use crate::remote::{RemoteConfig, RemoteStore, with_deadline};
use crate::types::{ConversationSummary, Fetched, MessageRecord, Source};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) const FALLBACK: &str = "colloquy::fallback";

/// Optimized → legacy → local mirror, with write-through into the mirror.
pub(crate) struct TieredSource {
    remote: Arc<dyn RemoteStore>,
    mirror: LocalMirror,
    config: RemoteConfig,
    health: Mutex<Option<(Instant, bool)>>,
}

impl TieredSource {
    pub(crate) fn new(remote: Arc<dyn RemoteStore>, mirror: LocalMirror, config: RemoteConfig) -> Self {
        Self { remote, mirror, config, health: Mutex::new(None) }
    }

    pub(crate) const fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub(crate) fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    /// Memoized health probe; a probe that times out counts as unhealthy.
    pub(crate) async fn is_healthy(&self) -> bool {
        let ttl = Duration::from_millis(self.config.health_ttl_ms);
        let memo = *self.health.lock();
        if let Some((at, healthy)) = memo
            && at.elapsed() < ttl
        {
            return healthy;
        }
        let healthy = tokio::time::timeout(self.config.health_timeout(), self.remote.health_check())
            .await
            .unwrap_or(false);
        *self.health.lock() = Some((Instant::now(), healthy));
        if !healthy {
            log::warn!(target: FALLBACK, "remote health check failed; optimized path disabled for {} ms", ttl.as_millis());
        }
        healthy
    }

    /// Forgets the memoized health result.
    pub(crate) fn reset_health(&self) {
        *self.health.lock() = None;
    }

    /// One window through the optimized path, or `None` when it is skipped or fails.
    pub(crate) async fn optimized_window(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Option<Vec<ConversationSummary>> {
        if !self.is_healthy().await {
            return None;
        }
        let fut = self.remote.fetch_conversations_optimized(user_id, limit, offset);
        match with_deadline("fetch_conversations_optimized", self.config.read_timeout(), fut).await {
            Ok(list) => Some(list),
            Err(e) => {
                log::warn!(target: FALLBACK, "optimized conversation fetch for {user_id} failed, trying legacy: {e}");
                None
            }
        }
    }

    /// The full list through the optimized path, `optimized_fetch_limit` rows per call until
    /// a short window marks the end. `None` if any window is skipped or fails.
    pub(crate) async fn optimized_list(&self, user_id: &str) -> Option<Vec<ConversationSummary>> {
        let limit = self.config.optimized_fetch_limit;
        let mut all: Vec<ConversationSummary> = Vec::new();
        let mut seen = HashSet::new();
        loop {
            let window = self.optimized_window(user_id, limit, all.len()).await?;
            let done = window.len() < limit;
            for c in window {
                // remote ignored the offset
                if !seen.insert(c.id.clone()) {
                    log::warn!(target: FALLBACK, "optimized paging for {user_id} repeated {} at offset {}", c.id, all.len());
                    return None;
                }
                all.push(c);
            }
            if done {
                return Some(all);
            }
        }
    }

    /// The full list from the legacy path, mirrored on success.
    pub(crate) async fn legacy_list(&self, user_id: &str) -> Option<Vec<ConversationSummary>> {
        let fut = self.remote.fetch_conversations_legacy(user_id);
        match with_deadline("fetch_conversations_legacy", self.config.read_timeout(), fut).await {
            Ok(list) => {
                self.mirror_write("conversations", self.mirror.store_conversations(user_id, &list));
                Some(list)
            }
            Err(e) => {
                log::warn!(target: FALLBACK, "legacy conversation fetch for {user_id} failed, using local mirror: {e}");
                None
            }
        }
    }

    /// The mirrored list, or an empty `Unavailable` result.
    pub(crate) fn mirrored_list(&self, user_id: &str) -> Fetched<Vec<ConversationSummary>> {
        match self.mirror.conversations(user_id) {
            Ok(Some(list)) => Fetched::new(list, Source::Mirror),
            Ok(None) => Fetched::new(Vec::new(), Source::Unavailable),
            Err(e) => {
                log::warn!(target: FALLBACK, "local mirror unreadable for {user_id}: {e}");
                Fetched::new(Vec::new(), Source::Unavailable)
            }
        }
    }

    pub(crate) fn mirror_write(&self, what: &str, res: Result<(), DataError>) {
        if let Err(e) = res {
            log::warn!(target: FALLBACK, "mirror write-through of {what} failed: {e}");
        }
    }
}

#[async_trait]
impl PageSource for TieredSource {
    async fn all_conversations(&self, user_id: &str) -> Result<Fetched<Vec<ConversationSummary>>, DataError> {
        if let Some(list) = self.optimized_list(user_id).await {
            self.mirror_write("conversations", self.mirror.store_conversations(user_id, &list));
            return Ok(Fetched::new(list, Source::Optimized));
        }
        if let Some(list) = self.legacy_list(user_id).await {
            return Ok(Fetched::new(list, Source::Legacy));
        }
        Ok(self.mirrored_list(user_id))
    }

    async fn all_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Fetched<Vec<MessageRecord>>, DataError> {
        let fut = self.remote.fetch_messages(conversation_id, user_id);
        match with_deadline("fetch_messages", self.config.read_timeout(), fut).await {
            Ok(messages) => {
                self.mirror_write("messages", self.mirror.store_messages(conversation_id, &messages));
                return Ok(Fetched::new(messages, Source::Remote));
            }
            Err(e) => {
                log::warn!(target: FALLBACK, "message fetch for {conversation_id} failed, using local mirror: {e}");
            }
        }
        Ok(match self.mirror.messages(conversation_id) {
            Ok(Some(messages)) => Fetched::new(messages, Source::Mirror),
            Ok(None) => Fetched::new(Vec::new(), Source::Unavailable),
            Err(e) => {
                log::warn!(target: FALLBACK, "local mirror unreadable for {conversation_id}: {e}");
                Fetched::new(Vec::new(), Source::Unavailable)
            }
        })
    }
}

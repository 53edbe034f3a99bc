use crate::access::tiers::{FALLBACK, TieredSource};
use crate::cache::{CacheStatistics, CacheStore};
use crate::codec::CodecStats;
use crate::errors::DataError;
use crate::mirror::LocalMirror;
use crate::pagination::{PageSource, PaginationConfig, PaginationService, keys};
use crate::remote::{RemoteConfig, RemoteStore, with_deadline};
use crate::types::{
    ConversationSummary, Fetched, MessageRecord, Mutation, Page, Role, SearchHit, Source, is_temporary_id,
    temporary_id,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const AUDIT: &str = "colloquy::audit";

/// How long search results stay cached.
pub const SEARCH_TTL: Duration = Duration::from_secs(60);

/// Single entry point for conversation data.
///
/// Reads go cache → optimized remote → legacy remote → local mirror and never fail on
/// remote trouble: the worst case is an empty value tagged [`Source::Unavailable`].
/// Mutations always reach the mirror and invalidate every affected cache key before
/// returning.
#[derive(Clone)]
pub struct DataAccessFacade {
    cache: CacheStore,
    mirror: LocalMirror,
    pagination: PaginationService,
    tiers: Arc<TieredSource>,
}

impl std::fmt::Debug for DataAccessFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccessFacade")
            .field("pagination", &self.pagination)
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}

impl DataAccessFacade {
    /// # Errors
    /// Returns `DataError::Configuration` if either config is invalid.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: CacheStore,
        mirror: LocalMirror,
        remote_config: RemoteConfig,
        pagination_config: PaginationConfig,
    ) -> Result<Self, DataError> {
        remote_config.validate()?;
        let tiers = Arc::new(TieredSource::new(remote, mirror.clone(), remote_config));
        let source: Arc<dyn PageSource> = tiers.clone();
        let pagination = PaginationService::new(cache.clone(), source, pagination_config)?;
        Ok(Self { cache, mirror, pagination, tiers })
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }

    #[must_use]
    pub const fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    #[must_use]
    pub const fn pagination(&self) -> &PaginationService {
        &self.pagination
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStatistics {
        self.cache.stats()
    }

    #[must_use]
    pub fn codec_stats(&self) -> CodecStats {
        self.cache.codec().stats()
    }

    /// Memoized remote health; see `RemoteConfig::health_ttl_ms`.
    pub async fn is_remote_healthy(&self) -> bool {
        self.tiers.is_healthy().await
    }

    /// Drops the memoized health result so the next read probes again.
    pub fn reset_health(&self) {
        self.tiers.reset_health();
    }

    /// `limit` conversations starting at `offset`, most recently updated first.
    ///
    /// The optimized path pages server-side; the legacy path and the mirror return the full
    /// list, which is sliced here.
    pub async fn get_conversations(&self, user_id: &str, limit: usize, offset: usize) -> Fetched<Vec<ConversationSummary>> {
        let key = keys::conversation_list(user_id, limit, offset);
        if let Some(list) = self.cache.get::<Vec<ConversationSummary>>(&key) {
            return Fetched::new(list, Source::Cache);
        }
        let fetched = if let Some(window) = self.tiers.optimized_window(user_id, limit, offset).await {
            self.tiers.mirror_write("conversations", self.mirror.merge_conversations(user_id, offset, limit, &window));
            Fetched::new(window, Source::Optimized)
        } else if let Some(all) = self.tiers.legacy_list(user_id).await {
            Fetched::new(window_of(all, limit, offset), Source::Legacy)
        } else {
            self.tiers.mirrored_list(user_id).map(|all| window_of(all, limit, offset))
        };
        self.remember(&key, &fetched, None);
        fetched
    }

    /// Page `page_index` of the user's conversations through the pagination cache.
    ///
    /// # Errors
    /// Only `DataError::AlreadyLoading` when the same page is already being fetched.
    pub async fn get_conversation_page(
        &self,
        user_id: &str,
        page_index: usize,
        force_refresh: bool,
    ) -> Result<Fetched<Page<ConversationSummary>>, DataError> {
        self.pagination.load_conversation_page(user_id, page_index, force_refresh).await
    }

    /// Messages older than `cursor`, oldest first. Without a cursor the newest
    /// `initial_load_size` messages are returned unless `limit` says otherwise.
    ///
    /// # Errors
    /// Only `DataError::AlreadyLoading` when the same page is already being fetched.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
        force_refresh: bool,
    ) -> Result<Fetched<Page<MessageRecord>>, DataError> {
        let config = self.pagination.config();
        let limit = limit.unwrap_or(if cursor.is_none() { config.initial_load_size } else { config.page_size });
        self.pagination.load_message_page(conversation_id, user_id, cursor, Some(limit), force_refresh).await
    }

    /// A single summary, resolved from the user's full list.
    pub async fn get_conversation(&self, user_id: &str, conversation_id: &str) -> Fetched<Option<ConversationSummary>> {
        let key = keys::conversation(conversation_id);
        if let Some(summary) = self.cache.get::<ConversationSummary>(&key) {
            return Fetched::new(Some(summary), Source::Cache);
        }
        let found = match self.tiers.all_conversations(user_id).await {
            Ok(all) => all.map(|list| list.into_iter().find(|c| c.id == conversation_id)),
            Err(e) => {
                log::warn!(target: FALLBACK, "conversation lookup for {conversation_id} failed: {e}");
                Fetched::new(None, Source::Unavailable)
            }
        };
        if let Some(summary) = &found.value {
            if found.source != Source::Unavailable {
                self.store(&key, summary, None);
            }
        }
        found
    }

    /// Remote search, falling back to a substring search of the local mirror.
    pub async fn search(&self, user_id: &str, term: &str, limit: usize) -> Fetched<Vec<SearchHit>> {
        let key = keys::search(user_id, term, limit);
        if let Some(hits) = self.cache.get::<Vec<SearchHit>>(&key) {
            return Fetched::new(hits, Source::Cache);
        }
        let config = self.tiers.config();
        let fut = self.tiers.remote().search_conversations_and_messages(user_id, term, limit);
        let fetched = match with_deadline("search_conversations_and_messages", config.read_timeout(), fut).await {
            Ok(hits) => Fetched::new(hits, Source::Remote),
            Err(e) => {
                log::warn!(target: FALLBACK, "remote search for {user_id} failed, searching local mirror: {e}");
                match self.mirror.search(user_id, term, limit) {
                    Ok(hits) => Fetched::new(hits, Source::Mirror),
                    Err(e) => {
                        log::warn!(target: FALLBACK, "local mirror search for {user_id} failed: {e}");
                        Fetched::new(Vec::new(), Source::Unavailable)
                    }
                }
            }
        };
        self.remember(&key, &fetched, Some(SEARCH_TTL));
        fetched
    }

    /// Creates a conversation remotely, or locally under a temporary id when the remote
    /// write fails.
    pub async fn create_conversation(&self, user_id: &str, title: &str) -> Mutation<ConversationSummary> {
        let config = self.tiers.config();
        let fut = self.tiers.remote().create_conversation(title, user_id);
        let (record, confirmed) = match with_deadline("create_conversation", config.write_timeout(), fut).await {
            Ok(summary) => (summary, true),
            Err(e) => {
                log::warn!(target: FALLBACK, "create_conversation for {user_id} failed, keeping it local: {e}");
                (ConversationSummary::new(temporary_id(), title), false)
            }
        };
        self.tiers.mirror_write("new conversation", self.mirror.upsert_conversation(user_id, &record));
        self.pagination.invalidate_user(user_id);
        log::info!(target: AUDIT, "create_conversation user={user_id} id={} confirmed={confirmed}", record.id);
        Mutation { record, confirmed }
    }

    /// Appends a message remotely, or locally under a temporary id. Conversations that only
    /// exist locally never reach the remote store.
    pub async fn add_message(
        &self,
        user_id: &str,
        conversation_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Mutation<MessageRecord> {
        let remote_result = if is_temporary_id(conversation_id) {
            Err(DataError::Remote(format!("{conversation_id} has not been created remotely")))
        } else {
            let config = self.tiers.config();
            let fut = self.tiers.remote().add_message(conversation_id, role, content, metadata.clone());
            with_deadline("add_message", config.write_timeout(), fut).await
        };
        let (record, confirmed) = match remote_result {
            Ok(record) => (record, true),
            Err(e) => {
                log::warn!(target: FALLBACK, "add_message to {conversation_id} failed, keeping it local: {e}");
                let record = MessageRecord {
                    id: temporary_id(),
                    conversation_id: conversation_id.to_string(),
                    role,
                    content: content.to_string(),
                    created_at: Utc::now(),
                    metadata,
                };
                (record, false)
            }
        };
        self.tiers.mirror_write("new message", self.mirror.append_message(user_id, &record));
        self.invalidate_conversation(conversation_id);
        self.pagination.invalidate_user(user_id);
        log::info!(
            target: AUDIT,
            "add_message user={user_id} conversation={conversation_id} id={} confirmed={confirmed}",
            record.id
        );
        Mutation { record, confirmed }
    }

    /// Deletes through direct, force and admin procedures in turn, then removes the
    /// conversation locally regardless. Returns whether any remote tier confirmed.
    pub async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> bool {
        let confirmed = if is_temporary_id(conversation_id) {
            false
        } else {
            self.delete_remotely(user_id, conversation_id).await
        };
        if !confirmed {
            log::warn!(
                target: FALLBACK,
                "remote deletion of {conversation_id} unconfirmed; removing local copy only"
            );
        }
        if let Err(e) = self.mirror.remove_conversation(user_id, conversation_id) {
            log::warn!(target: FALLBACK, "mirror removal of {conversation_id} failed: {e}");
        }
        self.invalidate_conversation(conversation_id);
        self.pagination.invalidate_user(user_id);
        log::info!(target: AUDIT, "delete_conversation user={user_id} id={conversation_id} confirmed={confirmed}");
        confirmed
    }

    async fn delete_remotely(&self, user_id: &str, conversation_id: &str) -> bool {
        let remote = self.tiers.remote();
        let after = self.tiers.config().write_timeout();
        let attempts = [
            ("delete_conversation", remote.delete_conversation(conversation_id, user_id)),
            ("force_delete_conversation", remote.force_delete_conversation(conversation_id, user_id)),
            ("admin_delete_conversation", remote.admin_delete_conversation(conversation_id, user_id)),
        ];
        for (operation, fut) in attempts {
            match with_deadline(operation, after, fut).await {
                Ok(true) => return true,
                Ok(false) => log::warn!(target: FALLBACK, "{operation} refused {conversation_id}"),
                Err(e) => log::warn!(target: FALLBACK, "{operation} for {conversation_id} failed: {e}"),
            }
        }
        false
    }

    /// Drops the point read and every message page of the conversation.
    pub fn invalidate_conversation(&self, conversation_id: &str) -> usize {
        self.pagination.invalidate_conversation(conversation_id)
    }

    /// Drops every list, page and search result of the user.
    pub fn invalidate_user(&self, user_id: &str) -> usize {
        self.pagination.invalidate_user(user_id)
    }

    fn remember<T: serde::Serialize>(&self, key: &str, fetched: &Fetched<T>, ttl: Option<Duration>) {
        if fetched.source != Source::Unavailable {
            self.store(key, &fetched.value, ttl);
        }
    }

    fn store<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        if let Err(e) = self.cache.set_with_ttl(key, value, ttl) {
            log::warn!("{key} not cached: {e}");
        }
    }
}

fn window_of(all: Vec<ConversationSummary>, limit: usize, offset: usize) -> Vec<ConversationSummary> {
    all.into_iter().skip(offset).take(limit).collect()
}

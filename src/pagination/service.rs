use crate::cache::CacheStore;
use crate::errors::DataError;
use crate::pagination::config::PaginationConfig;
use crate::pagination::inflight::InFlight;
use crate::pagination::keys;
use crate::pagination::slicing::{page_messages, slice_conversations};
use crate::types::{ConversationSummary, Fetched, MessageRecord, Page, Source};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Full, ordered listings that pages are cut from.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Every conversation of the user, most recently updated first.
    async fn all_conversations(&self, user_id: &str) -> Result<Fetched<Vec<ConversationSummary>>, DataError>;

    /// Every message of the conversation, in any order.
    async fn all_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Fetched<Vec<MessageRecord>>, DataError>;
}

/// Cuts cached pages out of [`PageSource`] listings.
///
/// At most one fetch per cache key is outstanding; a concurrent request for the same key
/// fails with `DataError::AlreadyLoading`. Invalidations bump an epoch so that a fetch which
/// started before the invalidation never writes its now-stale result into the cache.
/// Pages cut from an `Unavailable` listing are returned but never cached.
#[derive(Clone)]
pub struct PaginationService {
    cache: CacheStore,
    source: Arc<dyn PageSource>,
    config: PaginationConfig,
    inflight: InFlight,
    epoch: Arc<AtomicU64>,
}

impl std::fmt::Debug for PaginationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginationService")
            .field("config", &self.config)
            .field("inflight", &self.inflight.len())
            .finish_non_exhaustive()
    }
}

impl PaginationService {
    /// # Errors
    /// Returns `DataError::Configuration` if `config` is invalid.
    pub fn new(cache: CacheStore, source: Arc<dyn PageSource>, config: PaginationConfig) -> Result<Self, DataError> {
        config.validate()?;
        Ok(Self { cache, source, config, inflight: InFlight::default(), epoch: Arc::new(AtomicU64::new(0)) })
    }

    #[must_use]
    pub const fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Whether a fetch for the cache key is outstanding.
    #[must_use]
    pub fn is_loading(&self, key: &str) -> bool {
        self.inflight.is_loading(key)
    }

    #[must_use]
    pub fn is_page_loading(&self, user_id: &str, page_index: usize) -> bool {
        self.inflight.is_loading(&keys::conversation_page(user_id, page_index))
    }

    /// Page `page_index` of the user's conversations.
    ///
    /// # Errors
    /// `DataError::AlreadyLoading` for a concurrent load of the same page, otherwise whatever
    /// the page source returns.
    pub async fn load_conversation_page(
        &self,
        user_id: &str,
        page_index: usize,
        force_refresh: bool,
    ) -> Result<Fetched<Page<ConversationSummary>>, DataError> {
        let key = keys::conversation_page(user_id, page_index);
        if !force_refresh {
            if let Some(page) = self.cache.get::<Page<ConversationSummary>>(&key) {
                return Ok(Fetched::new(page, Source::Cache));
            }
        }
        let _guard = self.inflight.begin(&key)?;
        let epoch = self.epoch.load(Ordering::Acquire);
        let fetched = self.source.all_conversations(user_id).await?;
        let page = slice_conversations(&fetched.value, page_index, self.config.page_size);
        if fetched.source != Source::Unavailable
            && self.store_if_current(epoch, &key, &page, self.config.conversation_page_ttl())
        {
            self.evict_distant_pages(user_id, page_index);
        }
        Ok(Fetched::new(page, fetched.source))
    }

    /// Messages of a conversation older than `cursor`, oldest first. `limit` defaults to
    /// the configured page size.
    ///
    /// # Errors
    /// `DataError::AlreadyLoading` for a concurrent load of the same page, otherwise whatever
    /// the page source returns.
    pub async fn load_message_page(
        &self,
        conversation_id: &str,
        user_id: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
        force_refresh: bool,
    ) -> Result<Fetched<Page<MessageRecord>>, DataError> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.config.page_size);
        let key = keys::message_page(conversation_id, cursor, limit);
        if !force_refresh {
            if let Some(page) = self.cache.get::<Page<MessageRecord>>(&key) {
                return Ok(Fetched::new(page, Source::Cache));
            }
        }
        let _guard = self.inflight.begin(&key)?;
        let epoch = self.epoch.load(Ordering::Acquire);
        let fetched = self.source.all_messages(conversation_id, user_id).await?;
        let source = fetched.source;
        let page = page_messages(fetched.value, cursor, limit);
        if source != Source::Unavailable {
            self.store_if_current(epoch, &key, &page, self.config.message_page_ttl());
        }
        Ok(Fetched::new(page, source))
    }

    /// Warms the page after `current_page`. Skipped when it is cached or already loading;
    /// failures are logged and dropped.
    pub async fn preload_next_page(&self, user_id: &str, current_page: usize) {
        let next = current_page + 1;
        let key = keys::conversation_page(user_id, next);
        if self.inflight.is_loading(&key) || self.cache.contains_key(&key) {
            return;
        }
        match self.load_conversation_page(user_id, next, false).await {
            Ok(_) => crate::dev6!("{{\"bench\":\"pagination\",\"op\":\"preload\",\"page\":{}}}", next),
            Err(e) => log::debug!("preload of page {next} for {user_id} skipped: {e}"),
        }
    }

    /// Drops the conversation's point-read and message pages. Returns the number removed.
    pub fn invalidate_conversation(&self, conversation_id: &str) -> usize {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        match keys::conversation_pattern(conversation_id) {
            Ok(re) => self.cache.invalidate_pattern(&re),
            Err(e) => {
                log::warn!("cannot invalidate conversation {conversation_id}: {e}");
                0
            }
        }
    }

    /// Drops every list, page and search result of the user. Returns the number removed.
    pub fn invalidate_user(&self, user_id: &str) -> usize {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        match keys::user_pattern(user_id) {
            Ok(re) => self.cache.invalidate_pattern(&re),
            Err(e) => {
                log::warn!("cannot invalidate user {user_id}: {e}");
                0
            }
        }
    }

    fn store_if_current<T: Serialize>(&self, epoch: u64, key: &str, value: &T, ttl: Duration) -> bool {
        if self.epoch.load(Ordering::Acquire) != epoch {
            crate::dev6!("{{\"bench\":\"pagination\",\"op\":\"stale\",\"key\":\"{}\"}}", key);
            return false;
        }
        match self.cache.set_with_ttl(key, value, Some(ttl)) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("page {key} not cached: {e}");
                false
            }
        }
    }

    fn evict_distant_pages(&self, user_id: &str, current: usize) {
        for index in 0..current.saturating_sub(self.config.max_cache_pages) {
            self.cache.delete(&keys::conversation_page(user_id, index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct Listing {
        conversations: Mutex<Vec<ConversationSummary>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Listing {
        fn new(n: usize, delay: Duration) -> Arc<Self> {
            let conversations = (0..n).map(|i| ConversationSummary::new(format!("c{i}"), format!("t{i}"))).collect();
            Arc::new(Self { conversations: Mutex::new(conversations), calls: AtomicUsize::new(0), delay })
        }
    }

    #[async_trait]
    impl PageSource for Listing {
        async fn all_conversations(&self, _user_id: &str) -> Result<Fetched<Vec<ConversationSummary>>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Fetched::new(self.conversations.lock().clone(), Source::Optimized))
        }

        async fn all_messages(&self, _c: &str, _u: &str) -> Result<Fetched<Vec<MessageRecord>>, DataError> {
            Err(DataError::Remote("no messages here".into()))
        }
    }

    fn service(source: Arc<Listing>) -> PaginationService {
        PaginationService::new(CacheStore::with_defaults(), source, PaginationConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let listing = Listing::new(45, Duration::ZERO);
        let svc = service(Arc::clone(&listing));
        let first = svc.load_conversation_page("u", 1, false).await.unwrap();
        assert_eq!(first.source, Source::Optimized);
        let again = svc.load_conversation_page("u", 1, false).await.unwrap();
        assert_eq!(again.source, Source::Cache);
        assert_eq!(first.value, again.value);
        assert_eq!(listing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_load_of_same_page_fails_fast() {
        let listing = Listing::new(10, Duration::from_millis(100));
        let svc = service(listing);
        let other = svc.clone();
        let first = tokio::spawn(async move { other.load_conversation_page("u", 0, false).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(svc.is_page_loading("u", 0));
        let second = svc.load_conversation_page("u", 0, false).await;
        assert!(matches!(second, Err(DataError::AlreadyLoading(_))));
        assert!(first.await.unwrap().is_ok());
        assert!(!svc.is_page_loading("u", 0));
    }

    #[tokio::test]
    async fn invalidation_during_fetch_keeps_result_out_of_cache() {
        let listing = Listing::new(10, Duration::from_millis(80));
        let svc = service(Arc::clone(&listing));
        let other = svc.clone();
        let load = tokio::spawn(async move { other.load_conversation_page("u", 0, false).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        svc.invalidate_user("u");
        assert!(load.await.unwrap().is_ok());
        assert!(!svc.cache.contains_key(&keys::conversation_page("u", 0)));
    }

    #[tokio::test]
    async fn distant_pages_are_evicted() {
        let svc = service(Listing::new(200, Duration::ZERO));
        for page in 0..=7 {
            svc.load_conversation_page("u", page, false).await.unwrap();
        }
        assert!(!svc.cache.contains_key(&keys::conversation_page("u", 0)));
        assert!(!svc.cache.contains_key(&keys::conversation_page("u", 1)));
        assert!(svc.cache.contains_key(&keys::conversation_page("u", 2)));
        assert!(svc.cache.contains_key(&keys::conversation_page("u", 7)));
    }

    #[tokio::test]
    async fn preload_swallows_failures_and_warms_cache() {
        let svc = service(Listing::new(45, Duration::ZERO));
        svc.preload_next_page("u", 0).await;
        assert!(svc.cache.contains_key(&keys::conversation_page("u", 1)));
        // message source always fails; nothing to propagate
        assert!(svc.load_message_page("c", "u", None, None, false).await.is_err());
    }
}

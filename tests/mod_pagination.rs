use async_trait::async_trait;
use colloquy::cache::CacheStore;
use colloquy::errors::DataError;
use colloquy::pagination::{PageSource, PaginationConfig, PaginationService, keys};
use colloquy::testing::{sample_conversations, sample_messages};
use colloquy::types::{ConversationSummary, Fetched, MessageRecord, Source};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Fixture {
    conversations: Vec<ConversationSummary>,
    messages: Mutex<Vec<MessageRecord>>,
    fetches: AtomicUsize,
    delay: Duration,
}

impl Fixture {
    fn new(conversations: usize, messages: usize) -> Arc<Self> {
        Arc::new(Self {
            conversations: sample_conversations(conversations),
            messages: Mutex::new(sample_messages("conv1", messages)),
            fetches: AtomicUsize::new(0),
            delay: Duration::ZERO,
        })
    }

    fn slow(conversations: usize, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            conversations: sample_conversations(conversations),
            messages: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            delay,
        })
    }
}

#[async_trait]
impl PageSource for Fixture {
    async fn all_conversations(&self, _user_id: &str) -> Result<Fetched<Vec<ConversationSummary>>, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Fetched::new(self.conversations.clone(), Source::Legacy))
    }

    async fn all_messages(&self, _c: &str, _u: &str) -> Result<Fetched<Vec<MessageRecord>>, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut shuffled = self.messages.lock().clone();
        // remote order is arbitrary
        shuffled.reverse();
        let len = shuffled.len();
        shuffled.rotate_left(len / 3);
        Ok(Fetched::new(shuffled, Source::Remote))
    }
}

fn service(fixture: &Arc<Fixture>) -> PaginationService {
    let source: Arc<dyn PageSource> = fixture.clone();
    PaginationService::new(CacheStore::with_defaults(), source, PaginationConfig::default()).unwrap()
}

#[tokio::test]
async fn first_message_page_is_newest_and_ascending() {
    for total in [5usize, 20, 47] {
        let fixture = Fixture::new(0, total);
        let svc = service(&fixture);
        let page = svc.load_message_page("conv1", "u", None, Some(20), false).await.unwrap().value;
        assert_eq!(page.items.len(), total.min(20));
        assert_eq!(page.has_more, total > 20);
        assert!(page.items.windows(2).all(|w| w[0].created_at < w[1].created_at));
        assert_eq!(page.items.last().map(|m| m.id.clone()), Some(format!("m{}", total - 1)));
        assert_eq!(page.next_cursor.is_some(), page.has_more);
    }
}

#[tokio::test]
async fn walking_cursors_visits_every_message_once() {
    let fixture = Fixture::new(0, 47);
    let svc = service(&fixture);
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = svc.load_message_page("conv1", "u", cursor.as_deref(), Some(10), false).await.unwrap().value;
        let mut ids: Vec<String> = page.items.iter().map(|m| m.id.clone()).collect();
        ids.append(&mut seen);
        seen = ids;
        if !page.has_more {
            break;
        }
        cursor = page.next_cursor;
    }
    let expected: Vec<String> = (0..47).map(|i| format!("m{i}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn same_cursor_twice_is_identical() {
    let fixture = Fixture::new(0, 30);
    let svc = service(&fixture);
    let first = svc.load_message_page("conv1", "u", None, Some(10), false).await.unwrap().value;
    let cursor = first.next_cursor.clone().unwrap();
    let a = svc.load_message_page("conv1", "u", Some(&cursor), Some(10), false).await.unwrap();
    let b = svc.load_message_page("conv1", "u", Some(&cursor), Some(10), true).await.unwrap();
    assert_eq!(a.value.items, b.value.items);
    assert_eq!(a.value.next_cursor, b.value.next_cursor);
    assert_eq!(b.source, Source::Remote);
}

#[tokio::test]
async fn conversation_pages_are_cached_and_refreshable() {
    let fixture = Fixture::new(45, 0);
    let svc = service(&fixture);
    let p0 = svc.load_conversation_page("u", 0, false).await.unwrap();
    assert_eq!(p0.source, Source::Legacy);
    assert_eq!(p0.value.items.len(), 20);
    assert!(p0.value.has_more);
    assert_eq!(p0.value.total_count, Some(45));

    assert_eq!(svc.load_conversation_page("u", 0, false).await.unwrap().source, Source::Cache);
    assert_eq!(fixture.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(svc.load_conversation_page("u", 0, true).await.unwrap().source, Source::Legacy);
    assert_eq!(fixture.fetches.load(Ordering::SeqCst), 2);

    let last = svc.load_conversation_page("u", 2, false).await.unwrap().value;
    assert_eq!(last.items.len(), 5);
    assert!(!last.has_more);
}

#[tokio::test]
async fn duplicate_in_flight_request_is_rejected() {
    let fixture = Fixture::slow(30, Duration::from_millis(100));
    let svc = service(&fixture);
    let background = svc.clone();
    let first = tokio::spawn(async move { background.load_conversation_page("u", 0, false).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(svc.is_loading(&keys::conversation_page("u", 0)));
    let err = svc.load_conversation_page("u", 0, false).await.unwrap_err();
    assert!(matches!(err, DataError::AlreadyLoading(_)));
    // other pages are not blocked
    assert!(svc.load_conversation_page("u", 1, false).await.is_ok());
    assert!(first.await.unwrap().is_ok());
    assert_eq!(fixture.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalidate_conversation_drops_its_message_pages() {
    let fixture = Fixture::new(0, 30);
    let svc = service(&fixture);
    svc.load_message_page("conv1", "u", None, Some(10), false).await.unwrap();
    svc.load_message_page("conv1", "u", None, Some(5), false).await.unwrap();
    assert_eq!(svc.invalidate_conversation("conv1"), 2);
    assert_eq!(svc.load_message_page("conv1", "u", None, Some(10), false).await.unwrap().source, Source::Remote);
}

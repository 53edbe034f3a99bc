use colloquy::cache::CacheStore;
use colloquy::mirror::{LocalMirror, MemoryMirror, MirrorConfig};
use colloquy::pagination::{PaginationConfig, keys};
use colloquy::remote::RemoteConfig;
use colloquy::testing::{Op, ScriptedRemote, sample_conversations, sample_messages};
use colloquy::types::{ConversationSummary, MessageRecord, Page, Role, Source, is_temporary_id};
use colloquy::DataAccessFacade;
use std::sync::Arc;
use std::time::Duration;

fn facade_with(remote: &Arc<ScriptedRemote>, remote_config: RemoteConfig) -> DataAccessFacade {
    let mirror = LocalMirror::new(Arc::new(MemoryMirror::new()), &MirrorConfig::default());
    DataAccessFacade::new(
        remote.clone(),
        CacheStore::with_defaults(),
        mirror,
        remote_config,
        PaginationConfig::default(),
    )
    .unwrap()
}

fn facade(remote: &Arc<ScriptedRemote>) -> DataAccessFacade {
    facade_with(remote, RemoteConfig::default())
}

fn seeded(conversations: usize) -> Arc<ScriptedRemote> {
    Arc::new(
        ScriptedRemote::new()
            .with_conversations("u", sample_conversations(conversations))
            .with_messages("c0", sample_messages("c0", 40)),
    )
}

#[tokio::test]
async fn legacy_path_serves_when_optimized_fails() {
    let remote = seeded(5);
    remote.fail(Op::Optimized, true);
    let facade = facade(&remote);

    let got = facade.get_conversations("u", 20, 0).await;
    assert_eq!(got.source, Source::Legacy);
    assert_eq!(got.value.len(), 5);
    let cached = facade.cache().get::<Vec<ConversationSummary>>(&keys::conversation_list("u", 20, 0));
    assert_eq!(cached, Some(got.value));
    assert_eq!(facade.get_conversations("u", 20, 0).await.source, Source::Cache);
}

#[tokio::test]
async fn optimized_path_pages_server_side() {
    let remote = seeded(30);
    let facade = facade(&remote);
    let window = facade.get_conversations("u", 10, 10).await;
    assert_eq!(window.source, Source::Optimized);
    assert_eq!(window.value.first().map(|c| c.id.as_str()), Some("c10"));
    assert_eq!(remote.calls(Op::Legacy), 0);
}

#[tokio::test]
async fn pages_past_the_optimized_fetch_limit_match_legacy() {
    let remote = seeded(1005);
    let facade = facade(&remote);
    let tail = facade.get_conversation_page("u", 50, false).await.unwrap();
    assert_eq!(tail.source, Source::Optimized);
    assert_eq!(tail.value.items.len(), 5);
    assert_eq!(tail.value.total_count, Some(1005));
    assert!(!tail.value.has_more);
    assert!(facade.get_conversation_page("u", 49, false).await.unwrap().value.has_more);
    assert_eq!(remote.calls(Op::Optimized), 4);
    assert_eq!(remote.calls(Op::Legacy), 0);
    let last = facade.get_conversation("u", "c1004").await;
    assert_eq!(last.value.map(|c| c.id), Some("c1004".to_string()));

    remote.fail(Op::Optimized, true);
    let legacy = facade.get_conversation_page("u", 50, true).await.unwrap();
    assert_eq!(legacy.source, Source::Legacy);
    assert_eq!(legacy.value.items, tail.value.items);
    assert_eq!(legacy.value.total_count, Some(1005));
}

#[tokio::test]
async fn optimized_list_is_assembled_from_consecutive_windows() {
    let remote = seeded(30);
    let facade = facade_with(&remote, RemoteConfig { optimized_fetch_limit: 7, ..RemoteConfig::default() });
    let page = facade.get_conversation_page("u", 1, false).await.unwrap();
    assert_eq!(page.source, Source::Optimized);
    assert_eq!(page.value.items.first().map(|c| c.id.as_str()), Some("c20"));
    assert_eq!(page.value.total_count, Some(30));
    // 7 + 7 + 7 + 7 + 2
    assert_eq!(remote.calls(Op::Optimized), 5);
    let mirrored = facade.mirror().conversations("u").unwrap().unwrap();
    assert_eq!(mirrored.len(), 30);
}

#[tokio::test]
async fn unconfirmed_delete_still_cleans_up_locally() {
    let remote = seeded(3);
    let facade = facade(&remote);
    assert!(facade.get_conversation("u", "c1").await.value.is_some());
    assert!(facade.cache().contains_key("conversation_c1"));

    for op in [Op::Delete, Op::ForceDelete, Op::AdminDelete] {
        remote.fail(op, true);
    }
    assert!(!facade.delete_conversation("u", "c1").await);
    assert_eq!(facade.cache().get::<ConversationSummary>("conversation_c1"), None);
    let mirrored = facade.mirror().conversations("u").unwrap().unwrap_or_default();
    assert!(mirrored.iter().all(|c| c.id != "c1"));
    assert_eq!(remote.calls(Op::AdminDelete), 1);
}

#[tokio::test]
async fn delete_escalates_until_a_tier_confirms() {
    let remote = seeded(3);
    remote.fail(Op::Delete, true);
    let facade = facade(&remote);
    assert!(facade.delete_conversation("u", "c2").await);
    assert_eq!(remote.calls(Op::ForceDelete), 1);
    assert_eq!(remote.calls(Op::AdminDelete), 0);
    assert!(remote.stored_conversations("u").iter().all(|c| c.id != "c2"));
}

#[tokio::test]
async fn add_message_invalidates_conversation_and_user_keys() {
    let remote = seeded(25);
    let facade = facade(&remote);
    facade.get_conversations("u", 20, 0).await;
    facade.get_conversation_page("u", 0, false).await.unwrap();
    facade.get_conversation_page("u", 1, false).await.unwrap();
    facade.get_messages("c0", "u", None, None, false).await.unwrap();
    facade.get_conversation("u", "c0").await;
    facade.search("u", "conversation", 10).await;
    let other = facade.get_messages("c3", "u", None, None, false).await.unwrap();
    assert!(other.value.items.is_empty());

    let added = facade.add_message("u", "c0", Role::User, "a new question", None).await;
    assert!(added.confirmed);

    let cache = facade.cache();
    assert_eq!(cache.get::<Vec<ConversationSummary>>(&keys::conversation_list("u", 20, 0)), None);
    assert_eq!(cache.get::<Page<ConversationSummary>>(&keys::conversation_page("u", 0)), None);
    assert_eq!(cache.get::<Page<ConversationSummary>>(&keys::conversation_page("u", 1)), None);
    assert_eq!(cache.get::<Page<MessageRecord>>(&keys::message_page("c0", None, 30)), None);
    assert_eq!(cache.get::<ConversationSummary>(&keys::conversation("c0")), None);
    assert!(!cache.contains_key(&keys::search("u", "conversation", 10)));
    // unrelated conversation untouched
    assert!(cache.contains_key(&keys::message_page("c3", None, 30)));

    let fresh = facade.get_messages("c0", "u", None, None, false).await.unwrap();
    assert_eq!(fresh.source, Source::Remote);
    assert_eq!(fresh.value.items.last().map(|m| m.content.as_str()), Some("a new question"));
}

#[tokio::test]
async fn initial_message_load_uses_initial_size() {
    let remote = seeded(1);
    let facade = facade(&remote);
    let first = facade.get_messages("c0", "u", None, None, false).await.unwrap().value;
    assert_eq!(first.items.len(), 30);
    let older = facade.get_messages("c0", "u", first.next_cursor.as_deref(), None, false).await.unwrap().value;
    assert_eq!(older.items.len(), 10);
    assert!(!older.has_more);
}

#[tokio::test]
async fn mirror_serves_when_remote_is_down() {
    let remote = seeded(4);
    let facade = facade(&remote);
    let online = facade.get_conversations("u", 20, 0).await.value;
    let online_messages = facade.get_messages("c0", "u", None, None, false).await.unwrap().value;

    remote.fail_all_reads();
    facade.cache().clear();
    let offline = facade.get_conversations("u", 20, 0).await;
    assert_eq!(offline.source, Source::Mirror);
    assert!(offline.source.is_degraded());
    assert_eq!(offline.value, online);

    let messages = facade.get_messages("c0", "u", None, None, false).await.unwrap();
    assert_eq!(messages.source, Source::Mirror);
    assert_eq!(messages.value.items, online_messages.items);
}

#[tokio::test]
async fn nothing_anywhere_is_empty_and_uncached() {
    let remote = seeded(4);
    remote.fail_all_reads();
    let facade = facade(&remote);
    let got = facade.get_conversations("u", 20, 0).await;
    assert_eq!(got.source, Source::Unavailable);
    assert!(got.value.is_empty());
    let page = facade.get_conversation_page("u", 0, false).await.unwrap();
    assert_eq!(page.source, Source::Unavailable);
    assert!(facade.cache().keys().is_empty());
}

#[tokio::test]
async fn offline_writes_get_temporary_ids() {
    let remote = seeded(2);
    remote.fail_all_writes();
    let facade = facade(&remote);

    let created = facade.create_conversation("u", "Draft ideas").await;
    assert!(!created.confirmed);
    assert!(is_temporary_id(&created.record.id));

    let added = facade.add_message("u", &created.record.id, Role::User, "first thought", None).await;
    assert!(!added.confirmed);
    assert!(is_temporary_id(&added.record.id));
    // a local-only conversation never reaches the remote store
    assert_eq!(remote.calls(Op::AddMessage), 0);

    let mirrored = facade.mirror().conversations("u").unwrap().unwrap();
    assert_eq!(mirrored[0].id, created.record.id);
    assert_eq!(mirrored[0].message_count, 1);
    assert_eq!(mirrored[0].last_message_preview, "first thought");
}

#[tokio::test]
async fn created_conversation_shows_up_on_next_read() {
    let remote = seeded(2);
    let facade = facade(&remote);
    assert_eq!(facade.get_conversations("u", 20, 0).await.value.len(), 2);
    let created = facade.create_conversation("u", "Fresh").await;
    assert!(created.confirmed);
    let list = facade.get_conversations("u", 20, 0).await;
    assert_ne!(list.source, Source::Cache);
    assert!(list.value.iter().any(|c| c.id == created.record.id));
}

#[tokio::test]
async fn unhealthy_remote_skips_optimized_path() {
    let remote = seeded(3);
    remote.set_healthy(false);
    let facade = facade(&remote);
    assert_eq!(facade.get_conversations("u", 20, 0).await.source, Source::Legacy);
    assert_eq!(facade.get_conversations("u", 10, 0).await.source, Source::Legacy);
    assert_eq!(remote.calls(Op::Optimized), 0);
    assert_eq!(remote.calls(Op::Health), 1);

    remote.set_healthy(true);
    facade.reset_health();
    assert_eq!(facade.get_conversations("u", 5, 0).await.source, Source::Optimized);
}

#[tokio::test]
async fn hanging_remote_falls_through_on_deadline() {
    let remote = seeded(3);
    let slow_config = RemoteConfig { read_timeout_ms: 30, health_timeout_ms: 30, ..Default::default() };
    let facade = facade_with(&remote, slow_config);
    facade.mirror().store_conversations("u", &sample_conversations(3)).unwrap();
    remote.set_delay(Duration::from_millis(300));

    let started = std::time::Instant::now();
    let got = facade.get_conversations("u", 20, 0).await;
    assert_eq!(got.source, Source::Mirror);
    assert_eq!(got.value.len(), 3);
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test]
async fn search_falls_back_to_mirror() {
    let remote = seeded(3);
    let facade = facade(&remote);
    let online = facade.search("u", "Conversation 1", 10).await;
    assert_eq!(online.source, Source::Remote);
    assert_eq!(online.value.len(), 1);
    assert_eq!(facade.search("u", "Conversation 1", 10).await.source, Source::Cache);

    facade.get_conversations("u", 20, 0).await;
    remote.fail_all_reads();
    facade.cache().clear();
    let offline = facade.search("u", "conversation 1", 10).await;
    assert_eq!(offline.source, Source::Mirror);
    assert_eq!(offline.value.first().map(|h| h.conversation_id.as_str()), Some("c1"));
}

#[tokio::test]
async fn stats_reflect_cache_activity() {
    let remote = seeded(3);
    let facade = facade(&remote);
    facade.get_conversations("u", 20, 0).await;
    facade.get_conversations("u", 20, 0).await;
    let stats = facade.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(facade.codec_stats().compressions_performed, 0);
}

use crate::types::{ConversationSummary, MessageRecord, Page};
use crate::utils::num::usize_to_u64;
use chrono::{DateTime, SecondsFormat, Utc};

/// Page `page_index` of an already-ordered list, `page_size` entries per page.
///
/// Past-the-end indexes produce an empty page with `has_more = false`.
#[must_use]
pub fn slice_conversations(
    all: &[ConversationSummary],
    page_index: usize,
    page_size: usize,
) -> Page<ConversationSummary> {
    let total = all.len();
    let start = page_index.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    let has_more = end < total;
    Page {
        items: all[start..end].to_vec(),
        has_more,
        next_cursor: has_more.then(|| (page_index + 1).to_string()),
        total_count: Some(usize_to_u64(total)),
    }
}

/// Encodes a message timestamp as a cursor. Nanosecond precision keeps the
/// strictly-older comparison exact.
#[must_use]
pub fn cursor_for(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// The `limit` newest messages strictly older than `cursor` (all messages when `None`),
/// returned oldest first. `next_cursor` points at the oldest returned message and is only
/// set when older messages remain. An unparseable cursor yields an empty page.
#[must_use]
pub fn page_messages(mut all: Vec<MessageRecord>, cursor: Option<&str>, limit: usize) -> Page<MessageRecord> {
    let total = usize_to_u64(all.len());
    if let Some(raw) = cursor {
        let Ok(before) = DateTime::parse_from_rfc3339(raw) else {
            return Page { total_count: Some(total), ..Page::empty() };
        };
        let before = before.with_timezone(&Utc);
        all.retain(|m| m.created_at < before);
    }
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    let has_more = all.len() > limit;
    all.truncate(limit);
    let next_cursor = if has_more { all.last().map(|m| cursor_for(m.created_at)) } else { None };
    all.reverse();
    Page { items: all, has_more, next_cursor, total_count: Some(total) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::{Duration, TimeZone};

    fn convs(n: usize) -> Vec<ConversationSummary> {
        (0..n).map(|i| ConversationSummary::new(format!("c{i}"), format!("t{i}"))).collect()
    }

    fn msgs(n: i64) -> Vec<MessageRecord> {
        (0..n)
            .map(|i| MessageRecord {
                id: format!("m{i}"),
                conversation_id: "c".into(),
                role: Role::Assistant,
                content: format!("body {i}"),
                created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::milliseconds(i * 250),
                metadata: None,
            })
            .collect()
    }

    #[test]
    fn conversation_pages_cover_the_list() {
        let all = convs(45);
        let p0 = slice_conversations(&all, 0, 20);
        assert_eq!(p0.items.len(), 20);
        assert!(p0.has_more);
        assert_eq!(p0.next_cursor.as_deref(), Some("1"));
        let p2 = slice_conversations(&all, 2, 20);
        assert_eq!(p2.items.len(), 5);
        assert!(!p2.has_more);
        assert_eq!(p2.total_count, Some(45));
        let past = slice_conversations(&all, 9, 20);
        assert!(past.items.is_empty());
        assert!(!past.has_more);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let p = slice_conversations(&convs(40), 1, 20);
        assert_eq!(p.items.len(), 20);
        assert!(!p.has_more);
    }

    #[test]
    fn message_cursor_walks_backwards_without_overlap() {
        let all = msgs(50);
        let first = page_messages(all.clone(), None, 20);
        assert_eq!(first.items.first().map(|m| m.id.as_str()), Some("m30"));
        assert_eq!(first.items.last().map(|m| m.id.as_str()), Some("m49"));
        assert!(first.has_more);

        let second = page_messages(all.clone(), first.next_cursor.as_deref(), 20);
        assert_eq!(second.items.first().map(|m| m.id.as_str()), Some("m10"));
        assert_eq!(second.items.last().map(|m| m.id.as_str()), Some("m29"));

        let third = page_messages(all, second.next_cursor.as_deref(), 20);
        assert_eq!(third.items.len(), 10);
        assert!(!third.has_more);
        assert_eq!(third.next_cursor, None);
    }

    #[test]
    fn garbage_cursor_is_an_empty_page() {
        let p = page_messages(msgs(5), Some("yesterday"), 20);
        assert!(p.items.is_empty());
        assert!(!p.has_more);
        assert_eq!(p.total_count, Some(5));
    }
}

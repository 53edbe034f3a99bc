use crate::cache::entry::Slots;
use std::time::Instant;

/// What one cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired: usize,
    pub evicted: usize,
    pub freed_bytes: u64,
}

/// Removes every entry whose TTL has elapsed at `now`. Returns (count, bytes freed).
pub(crate) fn purge_expired(slots: &mut Slots, now: Instant) -> (usize, u64) {
    let expired_keys: Vec<String> = slots
        .entries
        .values()
        .filter(|e| e.is_expired_at(now))
        .map(|e| e.key.clone())
        .collect();

    let mut freed: u64 = 0;
    for key in &expired_keys {
        if let Some(e) = slots.remove(key) {
            freed = freed.saturating_add(e.size_bytes);
        }
    }
    if !expired_keys.is_empty() {
        crate::dev6!(
            "{{\"bench\":\"cache\",\"op\":\"ttl_purge\",\"evicted\":{},\"freed_bytes\":{}}}",
            expired_keys.len(),
            freed
        );
    }
    (expired_keys.len(), freed)
}

/// Evicts strictly oldest-inserted entries until `total_bytes <= budget`.
/// Access frequency and recency of reads play no part.
pub(crate) fn evict_oldest(slots: &mut Slots, budget: u64) -> (usize, u64) {
    let mut count = 0usize;
    let mut freed: u64 = 0;
    while slots.total_bytes > budget {
        let Some(key) = slots.oldest_key().cloned() else { break };
        if let Some(e) = slots.remove(&key) {
            freed = freed.saturating_add(e.size_bytes);
            count += 1;
            crate::dev6!(
                "{{\"bench\":\"cache\",\"op\":\"evict\",\"key\":\"{}\",\"freed_bytes\":{}}}",
                key,
                e.size_bytes
            );
        }
    }
    (count, freed)
}

/// Expire, then evict until under budget.
pub(crate) fn cleanup(slots: &mut Slots, budget: u64, now: Instant) -> CleanupReport {
    let (expired, expired_bytes) = purge_expired(slots, now);
    let (evicted, evicted_bytes) = evict_oldest(slots, budget);
    CleanupReport { expired, evicted, freed_bytes: expired_bytes.saturating_add(evicted_bytes) }
}

use crate::codec::CompressedPayload;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Serialized form of a cached value.
#[derive(Debug, Clone)]
pub enum StoredValue {
    Plain(String),
    Compressed(CompressedPayload),
}

/// Represents an entry in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: StoredValue,
    pub inserted_at: Instant,
    pub ttl: Duration,
    /// Uncompressed serialized length; the only size the byte budget looks at.
    pub size_bytes: u64,
    /// Insertion sequence number, strictly increasing across the store.
    pub seq: u64,
}

impl CacheEntry {
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        matches!(self.value, StoredValue::Compressed(_))
    }

    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }

    /// Bytes actually held in memory for the value.
    #[must_use]
    pub fn stored_bytes(&self) -> u64 {
        match &self.value {
            StoredValue::Plain(s) => crate::utils::num::usize_to_u64(s.len()),
            StoredValue::Compressed(p) => p.compressed_size_bytes,
        }
    }
}

/// Entries plus the insertion-order index used for oldest-first eviction.
#[derive(Debug, Default)]
pub(crate) struct Slots {
    pub entries: HashMap<String, CacheEntry>,
    pub order: BTreeMap<u64, String>,
    pub next_seq: u64,
    pub total_bytes: u64,
}

impl Slots {
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Inserts `entry`, returning the entry it replaced.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        let previous = self.remove(&entry.key);
        self.total_bytes = self.total_bytes.saturating_add(entry.size_bytes);
        self.order.insert(entry.seq, entry.key.clone());
        self.entries.insert(entry.key.clone(), entry);
        previous
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.total_bytes = 0;
    }

    #[must_use]
    pub fn oldest_key(&self) -> Option<&String> {
        self.order.values().next()
    }
}

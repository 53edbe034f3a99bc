use crate::cache::config::{CacheConfig, CacheConfigPatch};
use crate::cache::entry::{CacheEntry, Slots, StoredValue};
use crate::cache::metrics::{CacheMetrics, CacheStatistics};
use crate::cache::policy::{self, CleanupReport};
use crate::codec::CompressionCodec;
use crate::errors::DataError;
use crate::utils::num::usize_to_u64;
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A thread-safe, byte-budgeted key/value cache with per-entry TTL and oldest-first eviction.
///
/// Values are stored as JSON text; text at or above the compression threshold is handed to
/// the codec and kept compressed when that pays off. Cloning yields another handle to the
/// same store.
#[derive(Clone)]
pub struct CacheStore {
    slots: Arc<Mutex<Slots>>,
    config: Arc<RwLock<CacheConfig>>,
    codec: Arc<CompressionCodec>,
    metrics: Arc<CacheMetrics>,
    cleaning: Arc<AtomicBool>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("config", &*self.config.read()).finish_non_exhaustive()
    }
}

impl CacheStore {
    /// # Errors
    /// Returns `DataError::Configuration` if `config` does not validate.
    pub fn new(config: CacheConfig, codec: Arc<CompressionCodec>) -> Result<Self, DataError> {
        config.validate()?;
        Ok(Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            config: Arc::new(RwLock::new(config)),
            codec,
            metrics: Arc::new(CacheMetrics::default()),
            cleaning: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Store with default configuration and a default codec.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots::default())),
            config: Arc::new(RwLock::new(CacheConfig::default())),
            codec: Arc::new(CompressionCodec::default()),
            metrics: Arc::new(CacheMetrics::default()),
            cleaning: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn config(&self) -> CacheConfig {
        self.config.read().clone()
    }

    #[must_use]
    pub fn codec(&self) -> &Arc<CompressionCodec> {
        &self.codec
    }

    /// Merges `patch` into the configuration. On error the prior configuration stays.
    ///
    /// # Errors
    /// Returns `DataError::Configuration` when the merged configuration is invalid.
    pub fn configure(&self, patch: &CacheConfigPatch) -> Result<(), DataError> {
        let next = {
            let mut cfg = self.config.write();
            let next = cfg.merged(patch)?;
            *cfg = next.clone();
            next
        };
        log::info!(target: "colloquy::metrics", "cache reconfigured: {next:?}");
        // a smaller budget takes effect immediately
        self.run_cleanup();
        Ok(())
    }

    /// Stores `value` under `key` with the default TTL.
    ///
    /// # Errors
    /// Returns `DataError::Json` if `value` cannot be serialized.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DataError> {
        self.set_with_ttl(key, value, None)
    }

    /// Stores `value` under `key`, replacing any existing entry, then runs a cleanup pass.
    ///
    /// # Errors
    /// Returns `DataError::Json` if `value` cannot be serialized.
    pub fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), DataError> {
        let json = serde_json::to_string(value)?;
        let size_bytes = usize_to_u64(json.len());
        let cfg = self.config();
        let ttl = ttl.unwrap_or_else(|| cfg.default_ttl());
        let stored = if cfg.enable_compression && size_bytes >= cfg.compression_threshold_bytes {
            let payload = self.codec.encode(&json);
            if payload.is_compressed() { StoredValue::Compressed(payload) } else { StoredValue::Plain(json) }
        } else {
            StoredValue::Plain(json)
        };

        let report = {
            let mut slots = self.slots.lock();
            let seq = slots.next_seq();
            slots.insert(CacheEntry {
                key: key.to_string(),
                value: stored,
                inserted_at: Instant::now(),
                ttl,
                size_bytes,
                seq,
            });
            policy::cleanup(&mut slots, cfg.max_size_bytes, Instant::now())
        };
        self.metrics.inserts.fetch_add(1, Ordering::Relaxed);
        self.record_cleanup(report);
        Ok(())
    }

    /// Returns the value under `key` if present, unexpired and decodable as `T`.
    ///
    /// Expired, undecodable or mistyped entries are deleted and count as misses.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let found = {
            let mut slots = self.slots.lock();
            let expired = slots.entries.get(key).map(|e| e.is_expired_at(Instant::now()));
            match expired {
                None => None,
                Some(true) => {
                    // lazy expiry on access
                    slots.remove(key);
                    self.metrics.expirations.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Some(false) => slots.entries.get(key).map(|e| (e.value.clone(), e.seq)),
            }
        };
        let Some((stored, seq)) = found else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let decoded = match stored {
            StoredValue::Plain(s) => Ok(s),
            StoredValue::Compressed(p) => self.codec.decode(&p),
        }
        .and_then(|text| serde_json::from_str::<T>(&text).map_err(DataError::from));

        match decoded {
            Ok(v) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            Err(e) => {
                log::warn!(target: "colloquy::metrics", "dropping unreadable cache entry {key}: {e}");
                let mut slots = self.slots.lock();
                // only drop it if nobody replaced it meanwhile
                if slots.entries.get(key).is_some_and(|cur| cur.seq == seq) {
                    slots.remove(key);
                }
                drop(slots);
                self.metrics.decode_failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// True when `key` holds an unexpired entry. Does not touch hit/miss counters.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.lock().entries.get(key).is_some_and(|e| !e.is_expired_at(Instant::now()))
    }

    /// Removes the entry under `key`. Returns whether something was removed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.slots.lock().remove(key).is_some();
        if removed {
            self.metrics.removes.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Deletes every key matching `pattern`. Returns how many were removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let removed = {
            let mut slots = self.slots.lock();
            let keys: Vec<String> =
                slots.entries.keys().filter(|k| pattern.is_match(k)).cloned().collect();
            for k in &keys {
                slots.remove(k);
            }
            keys.len()
        };
        if removed > 0 {
            self.metrics.removes.fetch_add(usize_to_u64(removed), Ordering::Relaxed);
            log::debug!(target: "colloquy::metrics", "invalidated {removed} entries matching {pattern}");
        }
        removed
    }

    /// Drops every entry and resets statistics.
    pub fn clear(&self) {
        self.slots.lock().clear();
        self.metrics.reset();
    }

    /// Live keys in insertion order, oldest first.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let slots = self.slots.lock();
        slots
            .order
            .values()
            .filter(|k| slots.entries.get(*k).is_some_and(|e| !e.is_expired_at(now)))
            .cloned()
            .collect()
    }

    /// Expires stale entries and evicts oldest-first until under budget.
    ///
    /// Re-entrant calls return an empty report instead of running a second pass.
    pub fn run_cleanup(&self) -> CleanupReport {
        if self.cleaning.swap(true, Ordering::AcqRel) {
            return CleanupReport::default();
        }
        let budget = self.config.read().max_size_bytes;
        let report = policy::cleanup(&mut self.slots.lock(), budget, Instant::now());
        self.cleaning.store(false, Ordering::Release);
        self.record_cleanup(report);
        report
    }

    fn record_cleanup(&self, report: CleanupReport) {
        if report.expired > 0 {
            self.metrics.expirations.fetch_add(usize_to_u64(report.expired), Ordering::Relaxed);
        }
        if report.evicted > 0 {
            self.metrics.evictions.fetch_add(usize_to_u64(report.evicted), Ordering::Relaxed);
            log::debug!(
                target: "colloquy::metrics",
                "evicted {} entries ({} bytes freed in pass)",
                report.evicted,
                report.freed_bytes
            );
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStatistics {
        let (total_bytes, entry_count, stored_bytes, compressed_entries) = {
            let slots = self.slots.lock();
            let stored: u64 = slots.entries.values().map(CacheEntry::stored_bytes).sum();
            let compressed = slots.entries.values().filter(|e| e.is_compressed()).count();
            (slots.total_bytes, usize_to_u64(slots.entries.len()), stored, usize_to_u64(compressed))
        };
        CacheStatistics {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            total_bytes,
            entry_count,
            stored_bytes,
            compressed_entries,
            inserts: self.metrics.inserts.load(Ordering::Relaxed),
            removes: self.metrics.removes.load(Ordering::Relaxed),
            expirations: self.metrics.expirations.load(Ordering::Relaxed),
            evictions: self.metrics.evictions.load(Ordering::Relaxed),
            decode_failures: self.metrics.decode_failures.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    pub(crate) fn corrupt_for_test(&self, key: &str) {
        if let Some(e) = self.slots.lock().entries.get_mut(key) {
            if let StoredValue::Compressed(p) = &mut e.value {
                p.encoded.truncate(p.encoded.len() / 2);
                p.compressed_size_bytes = usize_to_u64(p.encoded.len());
            }
        }
    }
}

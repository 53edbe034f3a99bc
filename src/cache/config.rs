use crate::errors::DataError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIB: u64 = 1024 * 1024;

/// Configuration for the cache store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size_bytes: u64,
    pub default_ttl_ms: u64,
    /// Values whose serialized form is at least this long are offered to the codec.
    pub compression_threshold_bytes: u64,
    pub enable_compression: bool,
    pub sweep_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 50 * MIB,
            default_ttl_ms: 300_000,
            compression_threshold_bytes: 1024,
            enable_compression: true,
            sweep_interval_ms: 60_000,
        }
    }
}

/// Partial update merged by `CacheStore::configure`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheConfigPatch {
    pub max_size_bytes: Option<u64>,
    pub default_ttl_ms: Option<u64>,
    pub compression_threshold_bytes: Option<u64>,
    pub enable_compression: Option<bool>,
    pub sweep_interval_ms: Option<u64>,
}

impl CacheConfig {
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// # Errors
    /// Returns `DataError::Configuration` for a zero budget, TTL or sweep interval.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.max_size_bytes == 0 {
            return Err(DataError::Configuration("max_size_bytes must be positive".into()));
        }
        if self.default_ttl_ms == 0 {
            return Err(DataError::Configuration("default_ttl_ms must be positive".into()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(DataError::Configuration("sweep_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Applies `patch` on a copy and validates the result; `self` is untouched.
    ///
    /// # Errors
    /// Same as [`CacheConfig::validate`].
    pub fn merged(&self, patch: &CacheConfigPatch) -> Result<Self, DataError> {
        let next = Self {
            max_size_bytes: patch.max_size_bytes.unwrap_or(self.max_size_bytes),
            default_ttl_ms: patch.default_ttl_ms.unwrap_or(self.default_ttl_ms),
            compression_threshold_bytes: patch
                .compression_threshold_bytes
                .unwrap_or(self.compression_threshold_bytes),
            enable_compression: patch.enable_compression.unwrap_or(self.enable_compression),
            sweep_interval_ms: patch.sweep_interval_ms.unwrap_or(self.sweep_interval_ms),
        };
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_unset_fields() {
        let base = CacheConfig::default();
        let next = base
            .merged(&CacheConfigPatch { default_ttl_ms: Some(1_000), ..Default::default() })
            .unwrap();
        assert_eq!(next.default_ttl_ms, 1_000);
        assert_eq!(next.max_size_bytes, base.max_size_bytes);
    }

    #[test]
    fn merge_rejects_zero_ttl() {
        let base = CacheConfig::default();
        let err = base.merged(&CacheConfigPatch { default_ttl_ms: Some(0), ..Default::default() });
        assert!(matches!(err, Err(DataError::Configuration(_))));
    }

    #[test]
    fn deserializes_partial_toml() {
        let cfg: CacheConfig = toml::from_str("max_size_bytes = 1024").unwrap();
        assert_eq!(cfg.max_size_bytes, 1024);
        assert_eq!(cfg.default_ttl_ms, 300_000);
    }
}

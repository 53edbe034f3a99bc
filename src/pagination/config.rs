use crate::errors::DataError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
    /// Messages returned by the first (cursor-less) load of a conversation.
    pub initial_load_size: usize,
    /// Cached conversation pages kept behind the page most recently loaded.
    pub max_cache_pages: usize,
    pub conversation_page_ttl_ms: u64,
    pub message_page_ttl_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            initial_load_size: 30,
            max_cache_pages: 5,
            conversation_page_ttl_ms: 120_000,
            message_page_ttl_ms: 60_000,
        }
    }
}

impl PaginationConfig {
    #[must_use]
    pub const fn conversation_page_ttl(&self) -> Duration {
        Duration::from_millis(self.conversation_page_ttl_ms)
    }

    #[must_use]
    pub const fn message_page_ttl(&self) -> Duration {
        Duration::from_millis(self.message_page_ttl_ms)
    }

    /// # Errors
    /// Returns `DataError::Configuration` for zero sizes or TTLs.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.page_size == 0 || self.initial_load_size == 0 {
            return Err(DataError::Configuration("page sizes must be positive".into()));
        }
        if self.conversation_page_ttl_ms == 0 || self.message_page_ttl_ms == 0 {
            return Err(DataError::Configuration("page TTLs must be positive".into()));
        }
        Ok(())
    }
}

mod config;
mod core;
mod entry;
mod metrics;
mod policy;
mod sweeper;

pub use config::{CacheConfig, CacheConfigPatch};
pub use core::CacheStore;
pub use entry::{CacheEntry, StoredValue};
pub use metrics::{CacheMetrics, CacheStatistics};
pub use policy::CleanupReport;
pub use sweeper::Sweeper;

//! Conversation data access layer: a byte-bounded TTL cache with transparent compression,
//! cached pagination over remote listings, and a facade that falls back from an optimized
//! remote path to a legacy one and finally to a local mirror.
pub mod access;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod errors;
pub mod mirror;
pub mod pagination;
pub mod remote;
pub mod runtime;
pub mod testing;
pub mod types;
pub mod utils;

pub use access::DataAccessFacade;
pub use cache::{CacheConfig, CacheStore};
pub use codec::CompressionCodec;
pub use config::DataLayerConfig;
pub use errors::DataError;
pub use pagination::PaginationService;
pub use remote::RemoteStore;
pub use runtime::DataLayer;

/// Configures logging from `COLLOQUY_LOG_*` environment variables.
///
/// Call once at startup before building a [`DataLayer`].
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be set up.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    utils::logger::configure_from_env()
}

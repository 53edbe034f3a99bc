//! Size-aware text compression used by the cache for large values.
mod algorithm;
mod config;
mod core;
mod metrics;
mod payload;

pub use algorithm::{CompressionAlgorithm, SimpleLz, Zstd};
pub use config::{AlgorithmChoice, CodecConfig};
pub use core::CompressionCodec;
pub use metrics::{CodecMetrics, CodecStats};
pub use payload::{Algorithm, CompressedPayload};

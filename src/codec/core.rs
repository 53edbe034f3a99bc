use crate::codec::algorithm::{CompressionAlgorithm, SimpleLz, Zstd};
use crate::codec::config::{AlgorithmChoice, CodecConfig};
use crate::codec::metrics::{CodecMetrics, CodecStats};
use crate::codec::payload::{Algorithm, CompressedPayload};
use crate::errors::DataError;
use crate::utils::num::{u64_to_usize, usize_to_u64};
use std::sync::atomic::Ordering;

/// Encodes text, keeping the compressed form only when it pays for itself.
pub struct CompressionCodec {
    config: CodecConfig,
    primary: Box<dyn CompressionAlgorithm>,
    fallback_zstd: Zstd,
    metrics: CodecMetrics,
}

impl std::fmt::Debug for CompressionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionCodec")
            .field("config", &self.config)
            .field("primary", &self.primary.kind())
            .finish_non_exhaustive()
    }
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl CompressionCodec {
    /// Builds a codec whose primary algorithm is picked from `config.algorithm`.
    #[must_use]
    pub fn new(config: CodecConfig) -> Self {
        let primary: Box<dyn CompressionAlgorithm> = match config.algorithm {
            AlgorithmChoice::Simple => Box::new(SimpleLz),
            AlgorithmChoice::Zstd => Box::new(Zstd { level: config.zstd_level }),
        };
        Self::with_algorithm(config, primary)
    }

    /// Builds a codec around an injected algorithm.
    #[must_use]
    pub fn with_algorithm(config: CodecConfig, primary: Box<dyn CompressionAlgorithm>) -> Self {
        let fallback_zstd = Zstd { level: config.zstd_level };
        Self { config, primary, fallback_zstd, metrics: CodecMetrics::default() }
    }

    #[must_use]
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    #[must_use]
    pub fn primary_algorithm(&self) -> Algorithm {
        self.primary.kind()
    }

    /// Never fails: anything that cannot or should not be compressed comes back verbatim.
    pub fn encode(&self, text: &str) -> CompressedPayload {
        let original = text.len();
        if original < self.config.min_size_for_compression {
            self.metrics.compressions_skipped.fetch_add(1, Ordering::Relaxed);
            return CompressedPayload::verbatim(text);
        }
        let packed = match self.primary.compress(text.as_bytes()) {
            Ok(p) => p,
            Err(e) => {
                log::warn!(target: "colloquy::metrics", "compression failed, storing verbatim: {e}");
                self.metrics.compression_failures.fetch_add(1, Ordering::Relaxed);
                return CompressedPayload::verbatim(text);
            }
        };
        if (packed.len() as f64) >= self.config.max_ratio * original as f64 {
            self.metrics.compressions_skipped.fetch_add(1, Ordering::Relaxed);
            crate::dev6!(
                "{{\"bench\":\"codec\",\"op\":\"skip_uneconomic\",\"original\":{},\"compressed\":{}}}",
                original,
                packed.len()
            );
            return CompressedPayload::verbatim(text);
        }
        let original64 = usize_to_u64(original);
        let packed64 = usize_to_u64(packed.len());
        self.metrics.total_original_bytes.fetch_add(original64, Ordering::Relaxed);
        self.metrics.total_compressed_bytes.fetch_add(packed64, Ordering::Relaxed);
        self.metrics.compressions_performed.fetch_add(1, Ordering::Relaxed);
        crate::dev6!(
            "{{\"bench\":\"codec\",\"op\":\"compress\",\"original\":{},\"compressed\":{}}}",
            original64,
            packed64
        );
        CompressedPayload {
            encoded: packed,
            algorithm: self.primary.kind(),
            original_size_bytes: original64,
            compressed_size_bytes: packed64,
        }
    }

    /// # Errors
    /// Returns `DataError::Decode` when the tag, sizes and content do not agree.
    pub fn decode(&self, payload: &CompressedPayload) -> Result<String, DataError> {
        if usize_to_u64(payload.encoded.len()) != payload.compressed_size_bytes {
            return Err(DataError::Decode(format!(
                "payload holds {} bytes but records {}",
                payload.encoded.len(),
                payload.compressed_size_bytes
            )));
        }
        let original_len = u64_to_usize(payload.original_size_bytes)
            .ok_or_else(|| DataError::Decode("original size exceeds address space".into()))?;
        let bytes = match payload.algorithm {
            Algorithm::None => {
                if payload.original_size_bytes != payload.compressed_size_bytes {
                    return Err(DataError::Decode("verbatim payload with differing sizes".into()));
                }
                payload.encoded.clone()
            }
            Algorithm::Simple => SimpleLz::decompress_bytes(&payload.encoded, original_len)?,
            Algorithm::External => {
                if self.primary.kind() == Algorithm::External {
                    self.primary.decompress(&payload.encoded, original_len)?
                } else {
                    self.fallback_zstd.decompress(&payload.encoded, original_len)?
                }
            }
        };
        String::from_utf8(bytes).map_err(|e| DataError::Decode(e.to_string()))
    }

    #[must_use]
    pub fn stats(&self) -> CodecStats {
        self.metrics.snapshot()
    }

    pub fn reset_stats(&self) {
        self.metrics.reset();
    }
}

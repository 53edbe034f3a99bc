use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters across every `encode` call.
#[derive(Default, Debug)]
pub struct CodecMetrics {
    pub total_original_bytes: AtomicU64,
    pub total_compressed_bytes: AtomicU64,
    pub compressions_performed: AtomicU64,
    pub compressions_skipped: AtomicU64,
    pub compression_failures: AtomicU64,
}

impl CodecMetrics {
    pub fn snapshot(&self) -> CodecStats {
        CodecStats {
            total_original_bytes: self.total_original_bytes.load(Ordering::Relaxed),
            total_compressed_bytes: self.total_compressed_bytes.load(Ordering::Relaxed),
            compressions_performed: self.compressions_performed.load(Ordering::Relaxed),
            compressions_skipped: self.compressions_skipped.load(Ordering::Relaxed),
            compression_failures: self.compression_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total_original_bytes.store(0, Ordering::Relaxed);
        self.total_compressed_bytes.store(0, Ordering::Relaxed);
        self.compressions_performed.store(0, Ordering::Relaxed);
        self.compressions_skipped.store(0, Ordering::Relaxed);
        self.compression_failures.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodecStats {
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
    pub compressions_performed: u64,
    pub compressions_skipped: u64,
    pub compression_failures: u64,
}

impl CodecStats {
    /// `(original - compressed) / original * 100`, or 0 before any compression.
    #[must_use]
    pub fn space_saved_percentage(&self) -> f64 {
        if self.total_original_bytes == 0 {
            return 0.0;
        }
        let saved = self.total_original_bytes.saturating_sub(self.total_compressed_bytes);
        saved as f64 / self.total_original_bytes as f64 * 100.0
    }
}

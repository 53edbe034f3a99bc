use serde::{Deserialize, Serialize};

/// Tag recording which transform produced `encoded`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    None,
    Simple,
    External,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CompressedPayload {
    #[serde(with = "serde_bytes")]
    pub encoded: Vec<u8>,
    pub algorithm: Algorithm,
    pub original_size_bytes: u64,
    pub compressed_size_bytes: u64,
}

impl CompressedPayload {
    /// Store the text as-is, tagged `Algorithm::None`.
    #[must_use]
    pub fn verbatim(text: &str) -> Self {
        let len = crate::utils::num::usize_to_u64(text.len());
        Self {
            encoded: text.as_bytes().to_vec(),
            algorithm: Algorithm::None,
            original_size_bytes: len,
            compressed_size_bytes: len,
        }
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.algorithm != Algorithm::None
    }

    /// Compressed size over original size; 1.0 for empty or verbatim payloads.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.original_size_bytes == 0 {
            return 1.0;
        }
        self.compressed_size_bytes as f64 / self.original_size_bytes as f64
    }
}

use serde::{Deserialize, Serialize};

/// Which algorithm the codec compresses with. Decoding accepts every tag regardless.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmChoice {
    #[default]
    Simple,
    Zstd,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CodecConfig {
    /// Inputs shorter than this are never compressed.
    pub min_size_for_compression: usize,
    /// A result is kept only if `compressed < max_ratio * original`.
    pub max_ratio: f64,
    pub algorithm: AlgorithmChoice,
    pub zstd_level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            min_size_for_compression: 512,
            max_ratio: 0.9,
            algorithm: AlgorithmChoice::Simple,
            zstd_level: 3,
        }
    }
}

impl CodecConfig {
    /// # Errors
    /// Returns `DataError::Configuration` when the ratio is outside (0, 1].
    pub fn validate(&self) -> Result<(), crate::errors::DataError> {
        if !(self.max_ratio > 0.0 && self.max_ratio <= 1.0) {
            return Err(crate::errors::DataError::Configuration(format!(
                "codec max_ratio must be in (0, 1], got {}",
                self.max_ratio
            )));
        }
        Ok(())
    }
}

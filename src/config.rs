//! Aggregate configuration: TOML file, then `COLLOQUY_*` environment overrides.

use crate::cache::CacheConfig;
use crate::codec::{AlgorithmChoice, CodecConfig};
use crate::errors::DataError;
use crate::mirror::MirrorConfig;
use crate::pagination::PaginationConfig;
use crate::remote::RemoteConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_ENV: &str = "COLLOQUY_CONFIG";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct DataLayerConfig {
    pub cache: CacheConfig,
    pub codec: CodecConfig,
    pub pagination: PaginationConfig,
    pub remote: RemoteConfig,
    pub mirror: MirrorConfig,
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T, DataError> {
    raw.trim().parse().map_err(|_| DataError::Configuration(format!("{name}: cannot parse {raw:?}")))
}

impl DataLayerConfig {
    /// Missing tables and keys take their defaults.
    ///
    /// # Errors
    /// `DataError::Toml` for malformed input.
    pub fn from_toml_str(s: &str) -> Result<Self, DataError> {
        Ok(toml::from_str(s)?)
    }

    /// # Errors
    /// `DataError::Io` if unreadable, `DataError::Toml` if malformed.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// # Errors
    /// `DataError::Configuration` if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self).map_err(|e| DataError::Configuration(e.to_string()))
    }

    /// Candidate files in precedence order: `$COLLOQUY_CONFIG`, the user config dir, then
    /// `./colloquy.toml`.
    #[must_use]
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(p));
        }
        if let Some(dir) = dirs_next::config_dir() {
            paths.push(dir.join("colloquy.toml"));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join("colloquy.toml"));
        }
        paths
    }

    /// The first existing file from [`Self::search_paths`] (or defaults), then the
    /// environment, validated.
    ///
    /// # Errors
    /// Load, override and validation errors.
    pub fn discover() -> Result<Self, DataError> {
        let mut cfg = match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                log::debug!("loading configuration from {}", path.display());
                Self::load(&path)?
            }
            None => Self::default(),
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// `DataError::Configuration` for unparseable values.
    pub fn apply_env(&mut self) -> Result<(), DataError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies `COLLOQUY_*` overrides read through `lookup`.
    ///
    /// # Errors
    /// `DataError::Configuration` for unparseable values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DataError> {
        if let Some(v) = lookup("COLLOQUY_MAX_CACHE_BYTES") {
            self.cache.max_size_bytes = parse_var("COLLOQUY_MAX_CACHE_BYTES", &v)?;
        }
        if let Some(v) = lookup("COLLOQUY_DEFAULT_TTL_MS") {
            self.cache.default_ttl_ms = parse_var("COLLOQUY_DEFAULT_TTL_MS", &v)?;
        }
        if let Some(v) = lookup("COLLOQUY_PAGE_SIZE") {
            self.pagination.page_size = parse_var("COLLOQUY_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("COLLOQUY_MIRROR_DIR") {
            self.mirror.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("COLLOQUY_COMPRESSION") {
            match v.trim().to_ascii_lowercase().as_str() {
                "off" | "none" => self.cache.enable_compression = false,
                "simple" => {
                    self.cache.enable_compression = true;
                    self.codec.algorithm = AlgorithmChoice::Simple;
                }
                "zstd" => {
                    self.cache.enable_compression = true;
                    self.codec.algorithm = AlgorithmChoice::Zstd;
                }
                other => {
                    return Err(DataError::Configuration(format!(
                        "COLLOQUY_COMPRESSION: expected off|simple|zstd, got {other:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// # Errors
    /// The first failing section's `DataError::Configuration`.
    pub fn validate(&self) -> Result<(), DataError> {
        self.cache.validate()?;
        self.codec.validate()?;
        self.pagination.validate()?;
        self.remote.validate()?;
        if self.mirror.max_messages_per_conversation == 0 {
            return Err(DataError::Configuration("max_messages_per_conversation must be positive".into()));
        }
        Ok(())
    }
}

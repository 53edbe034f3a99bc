use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Already loading: {0}")]
    AlreadyLoading(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Mirror error: {0}")]
    Mirror(String),
}

impl DataError {
    /// Network, timeout and server-side failures that should fall through to the next tier.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Timeout { .. })
    }
}

impl From<std::io::Error> for DataError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(DataError::Remote("503".into()).is_transient());
        assert!(DataError::Timeout { operation: "fetch".into(), after_ms: 10 }.is_transient());
        assert!(!DataError::Decode("bad tag".into()).is_transient());
        assert!(!DataError::Configuration("ttl".into()).is_transient());
    }

    #[test]
    fn timeout_message_names_operation() {
        let e = DataError::Timeout { operation: "fetch_messages".into(), after_ms: 250 };
        assert_eq!(e.to_string(), "fetch_messages timed out after 250 ms");
    }
}

use std::path::PathBuf;

/// Maintenance operations over configuration, the file mirror and the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Effective configuration after file and environment overrides.
    ShowConfig,
    MirrorConversations {
        user_id: String,
    },
    MirrorMessages {
        conversation_id: String,
    },
    MirrorClear {
        user_id: String,
    },
    /// Compression economics of a file's contents under the configured codec.
    Codec {
        file: PathBuf,
    },
}

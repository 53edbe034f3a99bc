use crate::errors::DataError;
use crate::mirror::{MessageSnapshot, MirrorStore, UserSnapshot};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON files under one directory: `user_<id>.json` and `messages_<id>.json`.
///
/// Writes go through a temp file in the same directory and are renamed into place, so a
/// crash mid-write leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

/// Maps an id onto a file-name-safe stem; anything outside `[A-Za-z0-9_-]` is hex-escaped.
fn file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

impl FileMirror {
    /// # Errors
    /// Returns `DataError::Io` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DataError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// `<platform data dir>/colloquy/mirror`, falling back to `./colloquy_mirror`.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        dirs_next::data_dir()
            .map(|d| d.join("colloquy").join("mirror"))
            .unwrap_or_else(|| PathBuf::from("colloquy_mirror"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("user_{}.json", file_stem(user_id)))
    }

    fn messages_path(&self, conversation_id: &str) -> PathBuf {
        self.dir.join(format!("messages_{}.json", file_stem(conversation_id)))
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DataError> {
        match std::fs::read_to_string(path) {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), DataError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, value)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| DataError::Mirror(format!("persist {}: {e}", path.display())))?;
        Ok(())
    }

    fn remove(path: &Path) -> Result<bool, DataError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl MirrorStore for FileMirror {
    fn load_user(&self, user_id: &str) -> Result<Option<UserSnapshot>, DataError> {
        Self::read(&self.user_path(user_id))
    }

    fn save_user(&self, snapshot: &UserSnapshot) -> Result<(), DataError> {
        self.write(&self.user_path(&snapshot.user_id), snapshot)
    }

    fn remove_user(&self, user_id: &str) -> Result<bool, DataError> {
        Self::remove(&self.user_path(user_id))
    }

    fn load_messages(&self, conversation_id: &str) -> Result<Option<MessageSnapshot>, DataError> {
        Self::read(&self.messages_path(conversation_id))
    }

    fn save_messages(&self, snapshot: &MessageSnapshot) -> Result<(), DataError> {
        self.write(&self.messages_path(&snapshot.conversation_id), snapshot)
    }

    fn remove_messages(&self, conversation_id: &str) -> Result<bool, DataError> {
        Self::remove(&self.messages_path(conversation_id))
    }
}

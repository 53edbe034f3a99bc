use crate::errors::DataError;
use crate::mirror::{MessageSnapshot, MirrorStore, UserSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local mirror; useful in tests and for hosts without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    users: RwLock<HashMap<String, UserSnapshot>>,
    messages: RwLock<HashMap<String, MessageSnapshot>>,
}

impl MemoryMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MirrorStore for MemoryMirror {
    fn load_user(&self, user_id: &str) -> Result<Option<UserSnapshot>, DataError> {
        Ok(self.users.read().get(user_id).cloned())
    }

    fn save_user(&self, snapshot: &UserSnapshot) -> Result<(), DataError> {
        self.users.write().insert(snapshot.user_id.clone(), snapshot.clone());
        Ok(())
    }

    fn remove_user(&self, user_id: &str) -> Result<bool, DataError> {
        Ok(self.users.write().remove(user_id).is_some())
    }

    fn load_messages(&self, conversation_id: &str) -> Result<Option<MessageSnapshot>, DataError> {
        Ok(self.messages.read().get(conversation_id).cloned())
    }

    fn save_messages(&self, snapshot: &MessageSnapshot) -> Result<(), DataError> {
        self.messages.write().insert(snapshot.conversation_id.clone(), snapshot.clone());
        Ok(())
    }

    fn remove_messages(&self, conversation_id: &str) -> Result<bool, DataError> {
        Ok(self.messages.write().remove(conversation_id).is_some())
    }
}

use crate::errors::DataError;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Keys with a fetch currently outstanding.
#[derive(Clone, Debug, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Clears the loading flag for its key when dropped, including on timeout or cancellation.
#[derive(Debug)]
pub struct LoadGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.keys.lock().remove(&self.key);
    }
}

impl InFlight {
    /// Marks `key` as loading.
    ///
    /// # Errors
    /// Returns `DataError::AlreadyLoading` if another load of `key` is outstanding.
    pub fn begin(&self, key: &str) -> Result<LoadGuard, DataError> {
        if !self.keys.lock().insert(key.to_string()) {
            return Err(DataError::AlreadyLoading(key.to_string()));
        }
        Ok(LoadGuard { keys: Arc::clone(&self.keys), key: key.to_string() })
    }

    #[must_use]
    pub fn is_loading(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Composition root: builds the layer from configuration and owns its background work.

use crate::access::DataAccessFacade;
use crate::cache::{CacheStore, Sweeper};
use crate::codec::CompressionCodec;
use crate::config::DataLayerConfig;
use crate::errors::DataError;
use crate::mirror::{FileMirror, LocalMirror, MemoryMirror, MirrorStore};
use crate::remote::RemoteStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Owns the facade, the cache sweeper thread and any preload tasks.
///
/// Nothing runs in the background until [`DataLayer::start`] or
/// [`DataLayer::spawn_preload`]; [`DataLayer::shutdown`] stops all of it and waits.
pub struct DataLayer {
    config: DataLayerConfig,
    facade: DataAccessFacade,
    sweeper: Mutex<Option<Sweeper>>,
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl std::fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLayer")
            .field("config", &self.config)
            .field("preloads", &self.tasks.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl DataLayer {
    /// # Errors
    /// `DataError::Configuration` if `config` does not validate.
    pub fn new(
        config: DataLayerConfig,
        remote: Arc<dyn RemoteStore>,
        mirror: Arc<dyn MirrorStore>,
    ) -> Result<Self, DataError> {
        config.validate()?;
        let codec = Arc::new(CompressionCodec::new(config.codec.clone()));
        let cache = CacheStore::new(config.cache.clone(), codec)?;
        let mirror = LocalMirror::new(mirror, &config.mirror);
        let facade =
            DataAccessFacade::new(remote, cache, mirror, config.remote.clone(), config.pagination.clone())?;
        Ok(Self {
            config,
            facade,
            sweeper: Mutex::new(None),
            tasks: TaskTracker::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Like [`DataLayer::new`], with a file mirror when `mirror.dir` is set and an
    /// in-memory one otherwise.
    ///
    /// # Errors
    /// Configuration errors, or `DataError::Io` if the mirror directory cannot be created.
    pub fn from_config(config: DataLayerConfig, remote: Arc<dyn RemoteStore>) -> Result<Self, DataError> {
        let mirror: Arc<dyn MirrorStore> = match &config.mirror.dir {
            Some(dir) => Arc::new(FileMirror::open(dir)?),
            None => Arc::new(MemoryMirror::new()),
        };
        Self::new(config, remote, mirror)
    }

    #[must_use]
    pub const fn facade(&self) -> &DataAccessFacade {
        &self.facade
    }

    #[must_use]
    pub const fn config(&self) -> &DataLayerConfig {
        &self.config
    }

    /// Starts the cache sweeper. Calling it again while it runs is a no-op.
    ///
    /// # Errors
    /// `DataError::Io` if the sweeper thread cannot be spawned.
    pub fn start(&self) -> Result<(), DataError> {
        let mut slot = self.sweeper.lock();
        if slot.as_ref().is_some_and(Sweeper::is_running) {
            return Ok(());
        }
        *slot = Some(Sweeper::spawn(self.facade.cache().clone())?);
        log::info!(
            target: "colloquy::metrics",
            "cache sweeper started (every {} ms)",
            self.facade.cache().config().sweep_interval_ms
        );
        Ok(())
    }

    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().as_ref().is_some_and(Sweeper::is_running)
    }

    /// Warms the page after `current_page` on a tracked task. Must be called inside a Tokio
    /// runtime. Returns `false` once shutdown has begun.
    pub fn spawn_preload(&self, user_id: &str, current_page: usize) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let facade = self.facade.clone();
        let token = self.cancel.clone();
        let user_id = user_id.to_string();
        self.tasks.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    log::debug!("preload of page {} for {user_id} cancelled", current_page + 1);
                }
                () = facade.pagination().preload_next_page(&user_id, current_page) => {}
            }
        });
        true
    }

    /// Cancels outstanding preloads, stops the sweeper and waits for both.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        let sweeper = self.sweeper.lock().take();
        if let Some(mut sweeper) = sweeper {
            if tokio::task::spawn_blocking(move || sweeper.stop()).await.is_err() {
                log::warn!(target: "colloquy::metrics", "cache sweeper did not stop cleanly");
            }
        }
        let stats = self.facade.cache_stats();
        log::info!(
            target: "colloquy::metrics",
            "data layer stopped: entries={} bytes={} hit_rate={:.3}",
            stats.entry_count,
            stats.total_bytes,
            stats.hit_rate()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::keys;
    use crate::testing::{ScriptedRemote, sample_conversations};
    use std::time::Duration;

    fn layer(remote: ScriptedRemote) -> DataLayer {
        DataLayer::from_config(DataLayerConfig::default(), Arc::new(remote)).unwrap()
    }

    #[tokio::test]
    async fn start_is_idempotent_and_shutdown_stops_sweeper() {
        let layer = layer(ScriptedRemote::new());
        layer.start().unwrap();
        layer.start().unwrap();
        assert!(layer.is_sweeping());
        layer.shutdown().await;
        assert!(!layer.is_sweeping());
        assert!(!layer.spawn_preload("u", 0));
    }

    #[tokio::test]
    async fn preload_task_warms_the_next_page() {
        let layer = layer(ScriptedRemote::new().with_conversations("u", sample_conversations(45)));
        assert!(layer.spawn_preload("u", 0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(layer.facade().cache().contains_key(&keys::conversation_page("u", 1)));
        layer.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_cancels_slow_preloads() {
        let remote = ScriptedRemote::new().with_conversations("u", sample_conversations(45));
        remote.set_delay(Duration::from_secs(30));
        let layer = layer(remote);
        assert!(layer.spawn_preload("u", 0));
        tokio::time::timeout(Duration::from_secs(5), layer.shutdown()).await.unwrap();
        assert!(!layer.facade().cache().contains_key(&keys::conversation_page("u", 1)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = DataLayerConfig::default();
        config.pagination.page_size = 0;
        assert!(DataLayer::from_config(config, Arc::new(ScriptedRemote::new())).is_err());
    }
}

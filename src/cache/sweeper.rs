use crate::cache::core::CacheStore;
use crate::errors::DataError;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;

/// Background thread that periodically runs `CacheStore::run_cleanup`.
///
/// A plain thread keeps the sweep independent of any async runtime. The interval is
/// re-read from the store configuration before every wait, so `configure` applies to
/// the next cycle.
pub struct Sweeper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// # Errors
    /// Returns `DataError::Io` if the thread cannot be spawned.
    pub fn spawn(cache: CacheStore) -> Result<Self, DataError> {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new().name("colloquy-sweeper".into()).spawn(move || {
            loop {
                let interval = cache.config().sweep_interval();
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let report = cache.run_cleanup();
                        if report.expired + report.evicted > 0 {
                            log::debug!(
                                target: "colloquy::metrics",
                                "sweep: expired={} evicted={} freed_bytes={}",
                                report.expired,
                                report.evicted,
                                report.freed_bytes
                            );
                        }
                    }
                    // stop requested or every sender dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;
        Ok(Self { stop: Some(tx), handle: Some(handle) })
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the thread and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!(target: "colloquy::metrics", "cache sweeper thread panicked");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

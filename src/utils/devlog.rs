//! Developer trace lines ("level 6") with a thread-local capture sink.
//!
//! Cache and codec internals emit one-line JSON records through `dev6!`. Tests enable the
//! sink on their own thread and assert on what was emitted without touching the global logger.

use std::cell::RefCell;

pub const DEV_TARGET: &str = "colloquy::dev6";

thread_local! {
    static SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Disables capture for the current thread on drop.
pub struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        SINK.with(|s| *s.borrow_mut() = None);
    }
}

pub fn capture() -> CaptureGuard {
    SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    CaptureGuard
}

pub fn record(line: &str) {
    SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(line.to_owned());
        }
    });
}

/// Takes every captured line; empty when capture is off.
pub fn take() -> Vec<String> {
    SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Captured lines whose `"op"` field equals `op`.
pub fn ops(op: &str) -> Vec<String> {
    let needle = format!("\"op\":\"{op}\"");
    SINK.with(|s| {
        s.borrow()
            .as_ref()
            .map(|buf| buf.iter().filter(|l| l.contains(&needle)).cloned().collect())
            .unwrap_or_default()
    })
}

#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __line = format!($($arg)*);
        $crate::utils::devlog::record(&__line);
        log::log!(target: "colloquy::dev6", log::Level::Trace, "{}", __line);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_and_filters_by_op() {
        let _g = capture();
        crate::dev6!("{{\"bench\":\"cache\",\"op\":\"evict\",\"key\":\"{}\"}}", "a");
        crate::dev6!("{{\"bench\":\"cache\",\"op\":\"expire\"}}");
        assert_eq!(ops("evict").len(), 1);
        assert_eq!(take().len(), 2);
        assert!(take().is_empty());
    }

    #[test]
    fn other_threads_are_not_captured() {
        let _g = capture();
        let child = std::thread::spawn(|| {
            crate::dev6!("{{\"op\":\"child\"}}");
            take()
        })
        .join()
        .unwrap();
        assert!(child.is_empty());
        assert!(ops("child").is_empty());
    }
}

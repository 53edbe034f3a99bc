//! Stable, cache-backed pages over "load everything" remote listings.
mod config;
mod inflight;
pub mod keys;
mod service;
mod slicing;

pub use config::PaginationConfig;
pub use inflight::{InFlight, LoadGuard};
pub use service::{PageSource, PaginationService};
pub use slicing::{cursor_for, page_messages, slice_conversations};

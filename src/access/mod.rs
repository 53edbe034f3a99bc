//! The data access facade and the tiered source behind it.
mod facade;
mod tiers;

pub use facade::{DataAccessFacade, SEARCH_TTL};

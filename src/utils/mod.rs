//! Utility modules: numeric conversions, developer trace sink, log4rs setup.
pub mod devlog;
pub mod logger;
pub mod num;

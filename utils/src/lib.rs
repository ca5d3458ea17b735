//! Shared utilities for the notary.

pub mod format;
pub mod logging;

pub use format::{format_btc, format_duration};
pub use logging::{init_logging, LogFormat};

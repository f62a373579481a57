//! # Utilities Library
//!
//! Shared helpers for environment variables and timestamp formatting.

pub mod envs;
pub mod time;

// Re-export commonly used functions
pub use envs::{get_env, parse_flag};
pub use time::{format_clock, format_log_timestamp, now_local, now_millis};

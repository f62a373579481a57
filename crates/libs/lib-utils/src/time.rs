//! # Time Utilities
//!
//! Timestamp helpers for log headers, using chrono.

use chrono::{DateTime, Local, Utc};

/// Get current local time.
pub fn now_local() -> DateTime<Local> {
    Local::now()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a log header timestamp with microsecond precision,
/// e.g. `2024-03-01 12:30:45.123456`.
pub fn format_log_timestamp(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Format a wall-clock time to the second, e.g. `2024-03-01 12:30:45`.
pub fn format_clock(time: DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

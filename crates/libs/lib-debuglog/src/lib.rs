//! # Debug Log Library
//!
//! A file-based debugging aid. A [`DebugLog`] appends labeled records to
//! `<log_dir>/<channel>.log`: dumped values with memory and timing details,
//! named timers, memory readings, sessions, and a text scan of the code
//! around a call site.
//!
//! ```no_run
//! use lib_debuglog::{debug_log, DebugLog, DebugLogConfig};
//!
//! # fn main() -> lib_debuglog::Result<()> {
//! let mut log = DebugLog::new(DebugLogConfig::from_env());
//!
//! let order_total = 42;
//! debug_log!(log, order_total)?;
//!
//! log.start_timer("checkout");
//! let seconds = log.stop_timer("checkout")?;
//! # let _ = seconds;
//! # Ok(())
//! # }
//! ```
//!
//! One instance serves one thread. Share it with [`SharedDebugLog`]; the log
//! file itself is appended without cross-process locking.

pub mod config;
pub mod debug_log;
pub mod dump;
pub mod error;
pub mod logger;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod source;
pub mod symbols;
pub mod writer;

// Re-export commonly used types
pub use config::DebugLogConfig;
pub use debug_log::{AutoDebugReport, DebugLog, SessionSummary, SharedDebugLog};
pub use error::{DebugLogError, RegistryKind, Result};
pub use record::{FieldValue, LogRecord};
pub use snapshot::{capture_snapshot, Snapshot, StackFrame};
pub use source::{locate_enclosing_block, SourceBlock, SourceError};
pub use symbols::{extract_assignments, extract_call_expressions, Assignment};

/// Record a value under the source text of its expression.
///
/// `debug_log!(log, cart.total)` logs under the name `cart.total`; a third
/// argument overrides the name.
#[macro_export]
macro_rules! debug_log {
    ($log:expr, $value:expr $(,)?) => {
        $log.debug(&$value, stringify!($value))
    };
    ($log:expr, $value:expr, $name:expr $(,)?) => {
        $log.debug(&$value, $name)
    };
}

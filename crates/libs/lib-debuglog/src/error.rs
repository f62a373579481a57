//! # Error Handling
//!
//! [`DebugLogError`] covers the failures a caller must see: ending something
//! that was never started, and a log file that cannot be written. Source scan
//! failures live in [`SourceError`](crate::source::SourceError) and are soft;
//! they end up in the log instead of being returned.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience type alias for `Result<T, DebugLogError>`.
pub type Result<T> = std::result::Result<T, DebugLogError>;

/// Which registry a missing key was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Timer,
    Session,
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryKind::Timer => write!(f, "Timer"),
            RegistryKind::Session => write!(f, "Session"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DebugLogError {
    /// Stopping a timer or ending a session that is not active.
    #[error("{kind} '{name}' does not exist or has already ended")]
    NotFound { kind: RegistryKind, name: String },

    /// The log directory or file could not be created or appended to.
    #[error("Cannot write debug log {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DebugLogError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DebugLogError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// True for misuse of the timer/session registry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DebugLogError::NotFound { .. })
    }
}

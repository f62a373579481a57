//! Named start points for timers and sessions
//!
//! Each key is either absent or active. Starting an active key replaces its
//! start point (last start wins) and hands the old one back. Stopping an
//! absent key is an error. There is no internal locking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::error::{DebugLogError, RegistryKind, Result};

/// Start point of a timer.
#[derive(Debug, Clone, Copy)]
pub struct TimerStart {
    pub started: Instant,
}

impl TimerStart {
    pub fn now() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Start point of a session: timing plus the memory reading at start.
#[derive(Debug, Clone, Copy)]
pub struct SessionStart {
    pub started: Instant,
    /// Wall-clock start, for display only
    pub started_at: DateTime<Local>,
    pub memory_bytes: u64,
}

impl SessionStart {
    pub fn now(memory_bytes: u64) -> Self {
        Self {
            started: Instant::now(),
            started_at: lib_utils::now_local(),
            memory_bytes,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug)]
pub struct Registry<T> {
    kind: RegistryKind,
    active: HashMap<String, T>,
}

pub type TimerRegistry = Registry<TimerStart>;
pub type SessionRegistry = Registry<SessionStart>;

impl<T> Registry<T> {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            active: HashMap::new(),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// Activate `key`. Returns the replaced start point if it was already active.
    pub fn start(&mut self, key: impl Into<String>, start: T) -> Option<T> {
        self.active.insert(key.into(), start)
    }

    /// Deactivate `key` and return its start point.
    pub fn stop(&mut self, key: &str) -> Result<T> {
        self.active.remove(key).ok_or_else(|| DebugLogError::NotFound {
            kind: self.kind,
            name: key.to_string(),
        })
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Names of all active keys, sorted.
    pub fn active_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.active.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TimerRegistry {
    pub fn timers() -> Self {
        Self::new(RegistryKind::Timer)
    }
}

impl SessionRegistry {
    pub fn sessions() -> Self {
        Self::new(RegistryKind::Session)
    }
}

//! The `DebugLog` instance and its public operations
//!
//! One instance is created at startup and passed to whatever needs it.
//! Methods take `&mut self`; hosts that share it across threads wrap it in
//! [`SharedDebugLog`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::DebugLogConfig;
use crate::dump;
use crate::error::Result;
use crate::record::{FieldValue, LogRecord};
use crate::registry::{SessionRegistry, SessionStart, TimerRegistry, TimerStart};
use crate::snapshot::{self, bytes_to_mb, capture_memory, capture_snapshot, Snapshot};
use crate::source::{locate_enclosing_block, resolve_source_path, SourceBlock};
use crate::symbols::{extract_assignments, extract_call_expressions, Assignment};
use crate::writer::LogWriter;

/// Symbol prefix of this crate's own frames, hidden from `Called From`.
const CRATE_PREFIX: &str = "lib_debuglog::";

pub const MEMORY_WARNING: &str = "HIGH MEMORY USAGE DETECTED";
pub const TIME_WARNING: &str = "SLOW EXECUTION DETECTED";
const EXPRESSION_NOTE: &str =
    "Expression text, not a value; use debug_log! to record the runtime value";

/// A `DebugLog` behind a lock, for hosts with several threads.
pub type SharedDebugLog = Arc<Mutex<DebugLog>>;

/// What an auto-debug scan found around its call site.
#[derive(Debug, Clone)]
pub struct AutoDebugReport {
    /// Source path after resolution against the current directory
    pub file: PathBuf,
    pub line: u32,
    /// `None` when the source was unreadable or no block was found
    pub block: Option<SourceBlock>,
    pub assignments: Vec<Assignment>,
    pub calls: Vec<String>,
}

/// Outcome of ending a session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub name: String,
    pub elapsed: Duration,
    pub memory_delta_bytes: i64,
}

#[derive(Debug)]
pub struct DebugLog {
    config: DebugLogConfig,
    writer: LogWriter,
    timers: TimerRegistry,
    sessions: SessionRegistry,
    created: Instant,
    last_debug: Instant,
}

impl DebugLog {
    pub fn new(config: DebugLogConfig) -> Self {
        let writer = LogWriter::new(config.log_path());
        let now = Instant::now();

        tracing::debug!(
            log_file = %writer.path().display(),
            enabled = config.enabled,
            "Debug log created"
        );

        Self {
            config,
            writer,
            timers: TimerRegistry::timers(),
            sessions: SessionRegistry::sessions(),
            created: now,
            last_debug: now,
        }
    }

    pub fn from_env() -> Self {
        Self::new(DebugLogConfig::from_env())
    }

    pub fn into_shared(self) -> SharedDebugLog {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &DebugLogConfig {
        &self.config
    }

    // region:    --- Switches

    pub fn enable(&mut self) {
        self.config.enabled = true;
    }

    pub fn disable(&mut self) {
        self.config.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send subsequent records to `<log_dir>/<channel>.log`.
    pub fn set_channel(&mut self, channel: impl Into<String>) {
        self.config.channel = channel.into();
        self.writer = LogWriter::new(self.config.log_path());
        tracing::info!(
            channel = %self.config.channel,
            log_file = %self.writer.path().display(),
            "Debug log channel changed"
        );
    }

    pub fn channel(&self) -> &str {
        &self.config.channel
    }

    pub fn log_path(&self) -> &Path {
        self.writer.path()
    }

    // endregion: --- Switches

    /// Append a record unless logging is disabled.
    pub fn write_record(&self, record: &LogRecord) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        self.writer.write(record).map(|_| ())
    }

    /// Record `value` under `name` with memory, timing and call-site details.
    ///
    /// The name is required; `debug_log!(log, expr)` fills it in with the
    /// expression's source text.
    pub fn debug<T: Serialize + ?Sized>(&mut self, value: &T, name: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut record = LogRecord::new(name);

        if self.config.log_variables {
            record.push("Value", dump::render(value, self.config.max_dump_depth));
        }

        let snapshot = if self.config.log_memory || self.config.log_file_paths {
            Some(capture_snapshot(0))
        } else {
            None
        };

        if let (true, Some(snapshot)) = (self.config.log_memory, &snapshot) {
            let memory_mb = snapshot.memory_mb();
            record.push("Memory Usage", format!("{memory_mb:.2} MB"));
            if self.memory_exceeded(memory_mb) {
                record.push("Memory Warning", MEMORY_WARNING);
            }
        }

        if self.config.log_execution_time {
            let elapsed: FieldValue = [
                ("Total", format_ms(self.created.elapsed())),
                ("Since Last", format_ms(self.last_debug.elapsed())),
            ]
            .into_iter()
            .collect();
            record.push("Elapsed", elapsed);
        }

        if let (true, Some(snapshot)) = (self.config.log_file_paths, &snapshot) {
            record.push("Called From", self.called_from(snapshot));
        }

        self.last_debug = Instant::now();
        self.write_record(&record)
    }

    /// `debug` under the fixed name `DUMP`.
    pub fn dump<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.debug(value, "DUMP")
    }

    /// Scan the source around the caller and log what it appears to do.
    ///
    /// See [`auto_debug_at`](Self::auto_debug_at).
    #[track_caller]
    pub fn auto_debug(&mut self) -> Result<Option<AutoDebugReport>> {
        let caller = std::panic::Location::caller();
        self.auto_debug_at(caller.file(), caller.line())
    }

    /// Scan the brace-delimited block around `file:line` and log its body,
    /// each `name = expression;` it contains and the calls it makes, timing
    /// every step inside an `AutoDebug-<file>-<line>` session.
    ///
    /// This reads text, not values, and shares the limits of
    /// [`locate_block_in_text`](crate::source::locate_block_in_text). A source
    /// that cannot be scanned is logged as `Source Unavailable` and reported
    /// with `block: None`. Returns `None` while logging is disabled.
    pub fn auto_debug_at(
        &mut self,
        file: impl AsRef<Path>,
        line: u32,
    ) -> Result<Option<AutoDebugReport>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let file = file.as_ref();
        let session = format!("AutoDebug-{}-{}", snapshot::file_basename(file), line);
        self.start_session(Some(session.as_str()))?;

        let scanned = self.scan_source(&session, file, line);
        let ended = self.end_session(Some(session.as_str()));

        let report = scanned?;
        ended?;
        Ok(Some(report))
    }

    fn scan_source(&mut self, session: &str, file: &Path, line: u32) -> Result<AutoDebugReport> {
        self.write_record(
            &LogRecord::new("Source File")
                .field("Path", file.display().to_string())
                .field("Line", line.to_string()),
        )?;

        let resolved = resolve_source_path(file);
        let mut report = AutoDebugReport {
            file: resolved.clone(),
            line,
            block: None,
            assignments: Vec::new(),
            calls: Vec::new(),
        };

        match locate_enclosing_block(&resolved, line as usize) {
            Ok(block) => {
                self.analyze_block(session, &block, &mut report)?;
                report.block = Some(block);
            }
            Err(err) => {
                tracing::debug!(
                    path = %resolved.display(),
                    line,
                    error = %err,
                    "Auto-debug source unavailable"
                );
                self.write_record(
                    &LogRecord::new("Source Unavailable")
                        .field("Path", resolved.display().to_string())
                        .field("Line", line.to_string())
                        .field("Reason", err.to_string()),
                )?;
            }
        }

        Ok(report)
    }

    fn analyze_block(
        &mut self,
        session: &str,
        block: &SourceBlock,
        report: &mut AutoDebugReport,
    ) -> Result<()> {
        let code = block.text();
        self.write_record(&LogRecord::new("Function Body").field("Code", code.as_str()))?;

        let function_timer = format!("{session}::function_total");
        self.start_timer(&function_timer);

        // Timers are stopped before any write error propagates
        let logged = self.log_block_symbols(session, &code);
        let stopped = self.stop_timer(&function_timer);

        let (assignments, calls) = logged?;
        stopped?;

        report.assignments = assignments;
        report.calls = calls;
        Ok(())
    }

    fn log_block_symbols(
        &mut self,
        session: &str,
        code: &str,
    ) -> Result<(Vec<Assignment>, Vec<String>)> {
        let assignments = extract_assignments(code);
        for assignment in &assignments {
            let timer = format!("{session}::var_{}", assignment.name);
            self.start_timer(&timer);
            let written = self.write_record(
                &LogRecord::new(format!("Variable {}", assignment.name))
                    .field("Expression", assignment.expression.as_str())
                    .field("Note", EXPRESSION_NOTE),
            );
            let stopped = self.stop_timer(&timer);
            written?;
            stopped?;
        }

        let calls = extract_call_expressions(code);
        if !calls.is_empty() {
            self.write_record(
                &LogRecord::new("Function/Method Calls").field("Calls", calls.join(", ")),
            )?;
        }

        Ok((assignments, calls))
    }

    // region:    --- Timers

    /// Start (or restart) the timer `name`.
    pub fn start_timer(&mut self, name: &str) {
        if self.timers.start(name, TimerStart::now()).is_some() {
            tracing::warn!(timer = %name, "Timer restarted while active; previous start discarded");
        }
    }

    /// Stop the timer `name` and return its elapsed seconds.
    ///
    /// The timer is gone afterwards even when its record cannot be written.
    pub fn stop_timer(&mut self, name: &str) -> Result<f64> {
        let start = self.timers.stop(name)?;
        let elapsed = start.elapsed().as_secs_f64();

        if self.config.log_execution_time {
            let mut record = LogRecord::new(format!("Timer: {name}"))
                .field("Execution Time", format!("{elapsed:.4} seconds"));
            if self.time_exceeded(elapsed) {
                record.push("Time Warning", TIME_WARNING);
            }
            self.write_record(&record)?;
        }

        Ok(elapsed)
    }

    pub fn active_timers(&self) -> Vec<&str> {
        self.timers.active_names()
    }

    // endregion: --- Timers

    /// Record current and peak memory under `label`.
    pub fn log_memory(&mut self, label: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let reading = capture_memory();
        let memory_mb = bytes_to_mb(reading.memory_bytes);

        let mut record = LogRecord::new(label)
            .field("Current", format!("{memory_mb:.2} MB"))
            .field("Peak", format!("{:.2} MB", bytes_to_mb(reading.peak_memory_bytes)));
        if self.memory_exceeded(memory_mb) {
            record.push("Warning", MEMORY_WARNING);
        }

        self.write_record(&record)
    }

    // region:    --- Sessions

    /// Start a session and return its name.
    ///
    /// Without a name the session is called `Session-<caller>` after the
    /// nearest calling function outside this crate, so a matching
    /// `end_session(None)` in the same function finds it. The session is
    /// only registered once its record is written.
    pub fn start_session(&mut self, name: Option<&str>) -> Result<String> {
        let name = match name {
            Some(name) => name.to_string(),
            None => default_session_name(),
        };
        let start = SessionStart::now(capture_memory().memory_bytes);

        self.write_record(
            &LogRecord::new(format!("Started Debug Session: {name}"))
                .field("Time", lib_utils::format_clock(start.started_at)),
        )?;

        if self.sessions.start(name.as_str(), start).is_some() {
            tracing::warn!(session = %name, "Session restarted while active; previous start discarded");
        }

        Ok(name)
    }

    /// End a session, logging its duration and memory delta.
    ///
    /// The session is closed even when its record cannot be written.
    pub fn end_session(&mut self, name: Option<&str>) -> Result<SessionSummary> {
        let name = match name {
            Some(name) => name.to_string(),
            None => default_session_name(),
        };
        let start = self.sessions.stop(&name)?;

        let elapsed = start.elapsed();
        let memory_now = capture_memory().memory_bytes;
        let memory_delta_bytes = memory_now as i64 - start.memory_bytes as i64;

        self.write_record(
            &LogRecord::new(format!("Ended Debug Session: {name}"))
                .field("Duration", format!("{:.4} seconds", elapsed.as_secs_f64()))
                .field(
                    "Memory Delta",
                    format!("{:.2} MB", memory_delta_bytes as f64 / 1024.0 / 1024.0),
                )
                .field("Time", lib_utils::format_clock(lib_utils::now_local())),
        )?;

        Ok(SessionSummary {
            name,
            elapsed,
            memory_delta_bytes,
        })
    }

    pub fn active_sessions(&self) -> Vec<&str> {
        self.sessions.active_names()
    }

    // endregion: --- Sessions

    fn memory_exceeded(&self, memory_mb: f64) -> bool {
        memory_mb > self.config.memory_limit_warning_mb
    }

    fn time_exceeded(&self, elapsed_secs: f64) -> bool {
        elapsed_secs > self.config.execution_time_warning_secs
    }

    fn called_from(&self, snapshot: &Snapshot) -> FieldValue {
        let frames: Vec<(String, String)> = snapshot
            .frames_outside(CRATE_PREFIX)
            .skip(self.config.backtrace_skip)
            .take(self.config.backtrace_limit)
            .enumerate()
            .map(|(i, frame)| (i.to_string(), frame.to_string()))
            .collect();

        if frames.is_empty() {
            FieldValue::from("<no frames>")
        } else {
            frames.into_iter().collect()
        }
    }
}

impl Drop for DebugLog {
    fn drop(&mut self) {
        for timer in self.timers.active_names() {
            tracing::warn!(timer = %timer, "Debug log dropped with timer still running");
        }
        for session in self.sessions.active_names() {
            tracing::warn!(session = %session, "Debug log dropped with session still open");
        }
    }
}

fn default_session_name() -> String {
    let snapshot = capture_snapshot(0);
    let caller = snapshot
        .frames_outside(CRATE_PREFIX)
        .next()
        .map(|frame| frame.function.clone())
        .unwrap_or_else(|| "unknown".to_string());
    format!("Session-{caller}")
}

fn format_ms(duration: Duration) -> String {
    format!("{:.2}ms", duration.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> DebugLogConfig {
        DebugLogConfig::default().with_log_dir(dir)
    }

    #[test]
    fn test_disabled_writes_nothing_but_tracks_timers() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = DebugLog::new(config_in(tmp.path()).disabled());

        log.debug(&1, "one").unwrap();
        log.log_memory("mem").unwrap();
        log.start_timer("t");
        assert!(log.stop_timer("t").unwrap() >= 0.0);
        assert!(log.stop_timer("t").is_err());
        assert!(log.auto_debug().unwrap().is_none());

        assert!(!log.log_path().exists());
    }

    #[test]
    fn test_set_channel_moves_output() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = DebugLog::new(config_in(tmp.path()));

        log.set_channel("audit");
        log.log_memory("mem").unwrap();

        assert_eq!(log.channel(), "audit");
        assert!(tmp.path().join("audit.log").exists());
        assert!(!tmp.path().join("debug.log").exists());
    }

    #[test]
    fn test_enable_after_disable() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = DebugLog::new(config_in(tmp.path()).disabled());
        assert!(!log.is_enabled());
        log.enable();
        log.log_memory("mem").unwrap();
        assert!(log.log_path().exists());
    }

    #[test]
    fn test_thresholds_are_strict() {
        let tmp = tempfile::tempdir().unwrap();
        let log = DebugLog::new(
            config_in(tmp.path())
                .with_memory_warning_mb(100.0)
                .with_time_warning_secs(1.0),
        );
        assert!(!log.memory_exceeded(100.0));
        assert!(log.memory_exceeded(100.01));
        assert!(!log.time_exceeded(1.0));
        assert!(log.time_exceeded(1.5));
    }

    #[test]
    fn test_symbol_logging_stops_timers_when_writes_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut log = DebugLog::new(config_in(&blocker.join("logs")));

        let logged = log.log_block_symbols("AutoDebug-cart.rs-3", "    let total = 40 + 2;");

        assert!(logged.is_err());
        assert!(log.active_timers().is_empty());
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(Duration::from_micros(1500)), "1.50ms");
    }
}

//! Debug log configuration from environment variables
//!
//! Every value has a default; a missing or unparsable variable falls back to
//! it instead of failing.

use std::path::{Path, PathBuf};

use lib_utils::envs::parse_flag;

/// Debug log configuration
#[derive(Debug, Clone)]
pub struct DebugLogConfig {
    /// Master switch; when off nothing is written
    pub enabled: bool,
    /// Channel name, used as the log file stem
    pub channel: String,
    /// Directory holding `<channel>.log` and the diagnostics log
    pub log_dir: PathBuf,
    /// Memory usage (MB) above which records carry a warning
    pub memory_limit_warning_mb: f64,
    /// Timer duration (seconds) above which records carry a warning
    pub execution_time_warning_secs: f64,
    /// Include dumped values in `debug` records
    pub log_variables: bool,
    /// Include memory readings in `debug` records
    pub log_memory: bool,
    /// Log `Timer:` records and elapsed times
    pub log_execution_time: bool,
    /// Include the call stack in `debug` records
    pub log_file_paths: bool,
    /// Deepest container level expanded when dumping values
    pub max_dump_depth: usize,
    /// Caller frames dropped from `Called From` listings
    pub backtrace_skip: usize,
    /// Maximum number of frames in `Called From` listings
    pub backtrace_limit: usize,
    /// `EnvFilter` directive for the crate's own diagnostics
    pub diagnostics_filter: String,
}

impl Default for DebugLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: "debug".to_string(),
            log_dir: PathBuf::from("storage/logs"),
            memory_limit_warning_mb: 128.0,
            execution_time_warning_secs: 5.0,
            log_variables: true,
            log_memory: true,
            log_execution_time: true,
            log_file_paths: true,
            max_dump_depth: 2,
            backtrace_skip: 0,
            backtrace_limit: 16,
            diagnostics_filter: "lib_debuglog=info,warn".to_string(),
        }
    }
}

impl DebugLogConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| lib_utils::get_env(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            lookup(name)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default)
        };
        let number = |name: &str, default: f64| {
            lookup(name)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };
        let count = |name: &str, default: usize| {
            lookup(name)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        let mut log_dir = lookup("DEBUG_LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);
        let mut channel = lookup("DEBUG_LOG_CHANNEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.channel);

        // A full file path wins over the dir/channel pair
        if let Some(path) = lookup("DEBUG_LOG_PATH").filter(|v| !v.trim().is_empty()) {
            let path = PathBuf::from(path.trim());
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                channel = stem.to_string();
                log_dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
            }
        }

        Self {
            enabled: flag("DEBUG_LOG_ENABLED", defaults.enabled),
            channel,
            log_dir,
            memory_limit_warning_mb: number(
                "DEBUG_LOG_MEMORY_WARNING",
                defaults.memory_limit_warning_mb,
            ),
            execution_time_warning_secs: number(
                "DEBUG_LOG_TIME_WARNING",
                defaults.execution_time_warning_secs,
            ),
            log_variables: flag("DEBUG_LOG_VARIABLES", defaults.log_variables),
            log_memory: flag("DEBUG_LOG_MEMORY", defaults.log_memory),
            log_execution_time: flag("DEBUG_LOG_EXECUTION_TIME", defaults.log_execution_time),
            log_file_paths: flag("DEBUG_LOG_FILE_PATHS", defaults.log_file_paths),
            max_dump_depth: count("DEBUG_LOG_MAX_DUMP_DEPTH", defaults.max_dump_depth),
            backtrace_skip: count("DEBUG_LOG_BACKTRACE_SKIP", defaults.backtrace_skip),
            backtrace_limit: count("DEBUG_LOG_BACKTRACE_LIMIT", defaults.backtrace_limit),
            diagnostics_filter: lookup("RUST_LOG").unwrap_or(defaults.diagnostics_filter),
        }
    }

    /// Path of the debug log for the configured channel
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(format!("{}.log", self.channel))
    }

    /// Start with writing switched off.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    #[must_use]
    pub fn with_memory_warning_mb(mut self, threshold: f64) -> Self {
        self.memory_limit_warning_mb = threshold;
        self
    }

    #[must_use]
    pub fn with_time_warning_secs(mut self, threshold: f64) -> Self {
        self.execution_time_warning_secs = threshold;
        self
    }

    #[must_use]
    pub fn with_max_dump_depth(mut self, depth: usize) -> Self {
        self.max_dump_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = DebugLogConfig::from_lookup(|_| None);
        assert!(config.enabled);
        assert_eq!(config.channel, "debug");
        assert_eq!(config.log_path(), PathBuf::from("storage/logs/debug.log"));
        assert_eq!(config.memory_limit_warning_mb, 128.0);
        assert_eq!(config.execution_time_warning_secs, 5.0);
        assert_eq!(config.max_dump_depth, 2);
    }

    #[test]
    fn test_values_are_read() {
        let config = DebugLogConfig::from_lookup(lookup_from(&[
            ("DEBUG_LOG_ENABLED", "false"),
            ("DEBUG_LOG_CHANNEL", "daily"),
            ("DEBUG_LOG_DIR", "/tmp/app-logs"),
            ("DEBUG_LOG_MEMORY_WARNING", "64.5"),
            ("DEBUG_LOG_TIME_WARNING", "0.25"),
            ("DEBUG_LOG_FILE_PATHS", "0"),
            ("DEBUG_LOG_MAX_DUMP_DEPTH", "4"),
        ]));
        assert!(!config.enabled);
        assert_eq!(config.log_path(), PathBuf::from("/tmp/app-logs/daily.log"));
        assert_eq!(config.memory_limit_warning_mb, 64.5);
        assert_eq!(config.execution_time_warning_secs, 0.25);
        assert!(!config.log_file_paths);
        assert!(config.log_variables);
        assert_eq!(config.max_dump_depth, 4);
    }

    #[test]
    fn test_garbled_values_fall_back() {
        let config = DebugLogConfig::from_lookup(lookup_from(&[
            ("DEBUG_LOG_ENABLED", "perhaps"),
            ("DEBUG_LOG_MEMORY_WARNING", "lots"),
            ("DEBUG_LOG_TIME_WARNING", "NaN"),
            ("DEBUG_LOG_MAX_DUMP_DEPTH", "-1"),
            ("DEBUG_LOG_CHANNEL", "   "),
        ]));
        assert!(config.enabled);
        assert_eq!(config.memory_limit_warning_mb, 128.0);
        assert_eq!(config.execution_time_warning_secs, 5.0);
        assert_eq!(config.max_dump_depth, 2);
        assert_eq!(config.channel, "debug");
    }

    #[test]
    fn test_log_path_overrides_dir_and_channel() {
        let config = DebugLogConfig::from_lookup(lookup_from(&[
            ("DEBUG_LOG_DIR", "/ignored"),
            ("DEBUG_LOG_PATH", "/var/log/app/trace.log"),
        ]));
        assert_eq!(config.channel, "trace");
        assert_eq!(config.log_path(), PathBuf::from("/var/log/app/trace.log"));
    }

    #[test]
    fn test_builder_helpers() {
        let config = DebugLogConfig::default()
            .with_log_dir("/tmp/x")
            .with_channel("audit")
            .disabled();
        assert!(!config.enabled);
        assert_eq!(config.log_path(), PathBuf::from("/tmp/x/audit.log"));
    }
}

//! Point-in-time capture of process memory and the call stack

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use backtrace::{Frame, SymbolName};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

/// Upper bound on frames kept per capture.
const MAX_FRAMES: usize = 128;

/// Path prefixes of frames that belong to the capture machinery.
const CAPTURE_PREFIXES: &[&str] = &[
    "backtrace::",
    "lib_debuglog::snapshot::capture_",
    "lib_debuglog::snapshot::resolve_into",
];

/// Standard library paths that show up as glue between callers and callees.
const RUNTIME_PREFIXES: &[&str] = &["core::", "std::", "alloc::"];

/// Highest memory reading seen by this process.
static PEAK_MEMORY: AtomicU64 = AtomicU64::new(0);

/// A single resolved call-stack frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Function name without its path
    pub function: String,
    /// Enclosing type or module path, when the symbol has one
    pub qualifier: Option<String>,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
}

impl StackFrame {
    /// Build a frame from a demangled symbol path such as `app::Cart::total`.
    pub fn from_symbol(symbol: &str, file: Option<PathBuf>, line: Option<u32>) -> Self {
        let (qualifier, function) = split_symbol(symbol);
        Self {
            function: function.to_string(),
            qualifier: qualifier.map(str::to_string),
            file,
            line,
        }
    }

    /// `qualifier::function`, or just the function.
    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{qualifier}::{}", self.function),
            None => self.function.clone(),
        }
    }

    /// True when the frame's symbol path starts with `prefix`, also
    /// through a `<Type as Trait>` wrapper.
    pub fn is_under(&self, prefix: &str) -> bool {
        let name = self.qualified_name();
        let name = name.trim_start_matches('<');
        name.starts_with(prefix)
    }

    /// True for standard library frames such as `Option::unwrap_or_else`,
    /// `bool::then` or the `FnOnce::call_once` shim of a closure.
    pub fn is_runtime_glue(&self) -> bool {
        RUNTIME_PREFIXES.iter().any(|prefix| self.is_under(prefix))
            || self.qualified_name().contains(" as core::ops::function::Fn")
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        write!(
            f,
            "{}() in {}:{}",
            self.qualified_name(),
            file,
            self.line.unwrap_or(0)
        )
    }
}

/// Memory and call stack at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub timestamp_ms: i64,
    pub memory_bytes: u64,
    pub peak_memory_bytes: u64,
    /// Innermost frame first
    pub call_stack: Vec<StackFrame>,
}

impl Snapshot {
    pub fn memory_mb(&self) -> f64 {
        bytes_to_mb(self.memory_bytes)
    }

    pub fn peak_memory_mb(&self) -> f64 {
        bytes_to_mb(self.peak_memory_bytes)
    }

    /// Frames past the outermost one under `prefix`, innermost first.
    ///
    /// Standard library glue right after that frame is dropped too, so the
    /// first item is the code that called into `prefix`.
    pub fn frames_outside<'a>(&'a self, prefix: &str) -> impl Iterator<Item = &'a StackFrame> + 'a {
        let start = self
            .call_stack
            .iter()
            .rposition(|frame| frame.is_under(prefix))
            .map_or(0, |i| i + 1);

        self.call_stack[start..]
            .iter()
            .skip_while(|frame| frame.is_runtime_glue())
    }
}

/// Capture memory readings and the current call stack.
///
/// Everything up to the outermost frame of the capture machinery is
/// dropped, then the nearest `skip_frames` frames are discarded as well.
pub fn capture_snapshot(skip_frames: usize) -> Snapshot {
    let MemoryReading {
        memory_bytes,
        peak_memory_bytes,
    } = capture_memory();

    let frames = capture_frames();
    let first_outside = frames
        .iter()
        .rposition(|frame| CAPTURE_PREFIXES.iter().any(|prefix| frame.is_under(prefix)))
        .map_or(0, |i| i + 1);
    let call_stack = frames
        .into_iter()
        .skip(first_outside + skip_frames)
        .collect();

    Snapshot {
        timestamp_ms: lib_utils::now_millis(),
        memory_bytes,
        peak_memory_bytes,
        call_stack,
    }
}

/// Current and peak memory without walking the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryReading {
    pub memory_bytes: u64,
    pub peak_memory_bytes: u64,
}

pub fn capture_memory() -> MemoryReading {
    let memory_bytes = current_memory_bytes();
    let peak_memory_bytes = PEAK_MEMORY
        .fetch_max(memory_bytes, Ordering::Relaxed)
        .max(memory_bytes);

    MemoryReading {
        memory_bytes,
        peak_memory_bytes,
    }
}

/// Resident memory of the current process in bytes, or 0 when unavailable.
pub fn current_memory_bytes() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        tracing::debug!("Current PID unavailable; reporting zero memory");
        return 0;
    };

    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );

    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

fn capture_frames() -> Vec<StackFrame> {
    let mut frames = Vec::with_capacity(32);

    backtrace::trace(|frame| {
        resolve_into(frame, &mut frames);
        frames.len() < MAX_FRAMES
    });

    frames.truncate(MAX_FRAMES);
    frames
}

// Inlined calls resolve to several symbols for one frame; each becomes a frame.
fn resolve_into(frame: &Frame, frames: &mut Vec<StackFrame>) {
    let before = frames.len();

    backtrace::resolve_frame(frame, |symbol| {
        let name = symbol
            .name()
            .map(|name| symbol_name_to_string(&name))
            .unwrap_or_else(|| "<unknown>".to_string());
        let file = symbol.filename().map(Path::to_path_buf);
        frames.push(StackFrame::from_symbol(&name, file, symbol.lineno()));
    });

    if frames.len() == before {
        frames.push(StackFrame::from_symbol("<unknown>", None, None));
    }
}

fn symbol_name_to_string(name: &SymbolName<'_>) -> String {
    // Alternate form drops the trailing `::h0123abcd` hash
    format!("{name:#}")
}

/// Split `a::b::c` into (`a::b`, `c`), ignoring `::` inside `<...>`.
fn split_symbol(symbol: &str) -> (Option<&str>, &str) {
    let mut depth = 0usize;
    let mut split_at = None;
    let bytes = symbol.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => split_at = Some(i),
            _ => {}
        }
    }

    match split_at {
        Some(i) if i > 0 => (Some(&symbol[..i]), &symbol[i + 2..]),
        _ => (None, symbol),
    }
}

/// Last path component, for naming things after a file.
pub(crate) fn file_basename(path: &Path) -> String {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_path() {
        let frame = StackFrame::from_symbol("shop::cart::Cart::total", None, Some(12));
        assert_eq!(frame.function, "total");
        assert_eq!(frame.qualifier.as_deref(), Some("shop::cart::Cart"));
    }

    #[test]
    fn test_split_ignores_generic_paths() {
        let frame = StackFrame::from_symbol("<alloc::vec::Vec<T> as core::ops::Drop>::drop", None, None);
        assert_eq!(frame.function, "drop");
        assert_eq!(
            frame.qualifier.as_deref(),
            Some("<alloc::vec::Vec<T> as core::ops::Drop>")
        );
        assert!(frame.is_under("alloc::"));
    }

    #[test]
    fn test_bare_function_has_no_qualifier() {
        let frame = StackFrame::from_symbol("main", None, None);
        assert_eq!(frame.function, "main");
        assert!(frame.qualifier.is_none());
    }

    #[test]
    fn test_display_matches_called_from_format() {
        let frame = StackFrame::from_symbol(
            "app::Orders::store",
            Some(PathBuf::from("src/orders.rs")),
            Some(41),
        );
        assert_eq!(frame.to_string(), "app::Orders::store() in src/orders.rs:41");

        let unknown = StackFrame::from_symbol("<unknown>", None, None);
        assert_eq!(unknown.to_string(), "<unknown>() in unknown:0");
    }

    #[test]
    fn test_capture_reads_memory_and_peak() {
        let snapshot = capture_snapshot(0);
        assert!(snapshot.peak_memory_bytes >= snapshot.memory_bytes);
        assert!(snapshot.timestamp_ms > 0);
        assert!(snapshot.call_stack.len() <= MAX_FRAMES);
    }

    #[test]
    fn test_capture_drops_machinery_frames() {
        let snapshot = capture_snapshot(0);
        if let Some(first) = snapshot.call_stack.first() {
            assert!(!first.is_under("backtrace::"));
        }
    }

    #[test]
    fn test_capture_starts_at_caller() {
        let snapshot = capture_snapshot(0);
        let first = snapshot.call_stack.first().unwrap();
        assert_eq!(first.function, "test_capture_starts_at_caller");
        assert!(first.is_under("lib_debuglog::snapshot::tests::"));
    }

    #[test]
    fn test_skip_frames_drops_nearest_callers() {
        let full = capture_snapshot(0);
        let skipped = capture_snapshot(1);

        assert_eq!(full.call_stack[0].function, "test_skip_frames_drops_nearest_callers");
        assert_ne!(skipped.call_stack[0].function, "test_skip_frames_drops_nearest_callers");
        assert_eq!(
            skipped.call_stack[0].qualified_name(),
            full.call_stack[1].qualified_name()
        );
    }

    #[test]
    fn test_frames_outside_skips_past_glue() {
        let frame = |symbol: &str| StackFrame::from_symbol(symbol, None, None);
        let snapshot = Snapshot {
            timestamp_ms: 0,
            memory_bytes: 0,
            peak_memory_bytes: 0,
            call_stack: vec![
                frame("lib_debuglog::debug_log::DebugLog::debug::{{closure}}"),
                frame("core::bool::<impl bool>::then"),
                frame("lib_debuglog::debug_log::DebugLog::debug"),
                frame("<F as core::ops::function::FnOnce<()>>::call_once"),
                frame("core::option::Option<T>::unwrap_or_else"),
                frame("shop::checkout::place_order"),
                frame("core::ops::function::FnOnce::call_once"),
                frame("shop::main"),
            ],
        };

        let names: Vec<String> = snapshot
            .frames_outside("lib_debuglog::")
            .map(StackFrame::qualified_name)
            .collect();
        assert_eq!(
            names,
            vec![
                "shop::checkout::place_order",
                "core::ops::function::FnOnce::call_once",
                "shop::main",
            ]
        );
    }

    #[test]
    fn test_peak_never_below_current() {
        let first = capture_memory();
        let second = capture_memory();
        assert!(first.peak_memory_bytes >= first.memory_bytes);
        assert!(second.peak_memory_bytes >= first.memory_bytes);
    }

    #[test]
    fn test_bytes_to_mb() {
        assert_eq!(bytes_to_mb(3 * 1024 * 1024), 3.0);
    }
}

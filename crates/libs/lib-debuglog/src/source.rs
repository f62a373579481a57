//! # Source Locator
//!
//! Finds the block of text that encloses a given line by counting braces.
//!
//! This is a heuristic, not a parser: braces inside string literals and
//! comments are counted exactly like structural braces, so code such as
//! `println!("{}", x)` or `// }` can shift or break the located block.
//! Callers get either a block that contains the requested line or an
//! explicit [`SourceError`], never partial text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why no block could be located. All of these are soft failures.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line} is outside the file ({line_count} lines)")]
    LineOutOfRange { line: usize, line_count: usize },

    #[error("no balanced braces enclose line {line}")]
    Unbalanced { line: usize },

    #[error("block {start}-{end} does not contain line {line}")]
    OutsideBlock { line: usize, start: usize, end: usize },
}

/// A brace-delimited run of lines. Line numbers are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    pub start_line: usize,
    pub end_line: usize,
    pub lines: Vec<String>,
}

impl SourceBlock {
    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }

    /// The block's lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Read `path` and locate the block enclosing `line` (1-based).
pub fn locate_enclosing_block(path: impl AsRef<Path>, line: usize) -> Result<SourceBlock, SourceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SourceError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    locate_block_in_text(&text, line)
}

/// Locate the block enclosing `line` (1-based) in already loaded text.
pub fn locate_block_in_text(text: &str, line: usize) -> Result<SourceBlock, SourceError> {
    let lines: Vec<&str> = text.split('\n').collect();
    if line == 0 || line > lines.len() {
        return Err(SourceError::LineOutOfRange {
            line,
            line_count: lines.len(),
        });
    }

    let target = line - 1;
    let start = find_block_start(&lines, target).ok_or(SourceError::Unbalanced { line })?;
    let end = find_block_end(&lines, start).ok_or(SourceError::Unbalanced { line })?;

    if end < target {
        return Err(SourceError::OutsideBlock {
            line,
            start: start + 1,
            end: end + 1,
        });
    }

    Ok(SourceBlock {
        start_line: start + 1,
        end_line: end + 1,
        lines: lines[start..=end]
            .iter()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect(),
    })
}

/// Walk upward from `target` until the opening brace outweighs the
/// closing ones seen so far.
fn find_block_start(lines: &[&str], target: usize) -> Option<usize> {
    let mut depth: i64 = 0;

    for i in (0..=target).rev() {
        let (opening, closing) = count_braces(lines[i]);
        depth += closing - opening;

        if depth <= 0 && opening > 0 {
            return Some(i);
        }
    }

    None
}

/// Walk downward from the line after `start` until the depth returns to zero.
fn find_block_end(lines: &[&str], start: usize) -> Option<usize> {
    let mut depth: i64 = 1;

    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let (opening, closing) = count_braces(line);
        depth += opening - closing;

        if depth <= 0 {
            return Some(i);
        }
    }

    None
}

fn count_braces(line: &str) -> (i64, i64) {
    line.chars().fold((0, 0), |(open, close), c| match c {
        '{' => (open + 1, close),
        '}' => (open, close + 1),
        _ => (open, close),
    })
}

/// Resolve a call-site path recorded at compile time.
///
/// `file!()` paths are relative to the directory the build ran in, which is
/// often an ancestor of the current directory (a workspace root). The path is
/// returned unchanged when nothing matches, so the read fails with its
/// original name.
pub fn resolve_source_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }

    std::env::current_dir()
        .ok()
        .and_then(|cwd| {
            cwd.ancestors()
                .map(|dir| dir.join(path))
                .find(|candidate| candidate.is_file())
        })
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
fn outer() {
    let a = 1;
    if a > 0 {
        let b = 2;
    }
    let c = 3;
}
";

    #[test]
    fn test_block_around_inner_line() {
        let block = locate_block_in_text(SAMPLE, 4).unwrap();
        assert_eq!((block.start_line, block.end_line), (3, 5));
        assert!(block.contains_line(4));
        assert_eq!(block.lines[1].trim(), "let b = 2;");
    }

    #[test]
    fn test_block_for_function_level_line() {
        let block = locate_block_in_text(SAMPLE, 2).unwrap();
        assert_eq!((block.start_line, block.end_line), (1, 7));
        assert!(block.text().starts_with("fn outer() {"));
    }

    #[test]
    fn test_closed_sibling_block_is_rejected() {
        // Walking up from line 6 balances the `if` block's braces to zero,
        // so the scan stops on the sibling, which ends before line 6.
        let err = locate_block_in_text(SAMPLE, 6).unwrap_err();
        assert!(matches!(
            err,
            SourceError::OutsideBlock { line: 6, start: 3, end: 5 }
        ));
    }

    #[test]
    fn test_opening_line_is_its_own_start() {
        let block = locate_block_in_text(SAMPLE, 1).unwrap();
        assert_eq!((block.start_line, block.end_line), (1, 7));
    }

    #[test]
    fn test_no_braces_is_unbalanced() {
        let err = locate_block_in_text("let a = 1;\nlet b = 2;\n", 2).unwrap_err();
        assert!(matches!(err, SourceError::Unbalanced { line: 2 }));
    }

    #[test]
    fn test_unclosed_block_is_unbalanced() {
        let err = locate_block_in_text("fn f() {\n    let a = 1;\n", 2).unwrap_err();
        assert!(matches!(err, SourceError::Unbalanced { .. }));
    }

    #[test]
    fn test_line_out_of_range() {
        assert!(matches!(
            locate_block_in_text(SAMPLE, 0),
            Err(SourceError::LineOutOfRange { .. })
        ));
        assert!(matches!(
            locate_block_in_text(SAMPLE, 99),
            Err(SourceError::LineOutOfRange { .. })
        ));
    }

    #[test]
    fn test_block_ending_before_line_is_rejected() {
        // The first line opens two blocks but only one is tracked going forward
        let text = "a { b {\n}\nx\n}\n}\n";
        let err = locate_block_in_text(text, 3).unwrap_err();
        assert!(matches!(err, SourceError::OutsideBlock { line: 3, .. }));
    }

    #[test]
    fn test_braces_in_literals_are_counted() {
        // Documented limitation: the "}" literal closes the block early
        let text = "fn f() {\n    let s = \"}\";\n    let t = 1;\n}\n";
        let block = locate_block_in_text(text, 2).unwrap();
        assert_eq!(block.end_line, 2);
        assert!(locate_block_in_text(text, 3).is_err());
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = locate_enclosing_block("/definitely/not/here.rs", 1).unwrap_err();
        assert!(matches!(err, SourceError::Unreadable { .. }));
    }

    #[test]
    fn test_resolve_keeps_unknown_path() {
        let path = resolve_source_path("no/such/file.rs");
        assert_eq!(path, PathBuf::from("no/such/file.rs"));
    }
}

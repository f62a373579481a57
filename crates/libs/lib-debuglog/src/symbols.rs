//! # Symbol Extractor
//!
//! Regex scans over a block of source text. Results are text only: an
//! assignment's expression is the source of its right-hand side, never the
//! value it produced at runtime.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// `name = expr;` with an optional `$` sigil and `: Type` annotation.
/// The first character after `=` may not be `=` or `>`, which rules out
/// `==` and `=>`; `<=`, `>=` and `!=` never match because nothing but
/// whitespace may sit between the name and `=`.
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$?\b([A-Za-z_][A-Za-z0-9_]*)(?:\s*:\s*[^=;{}()]+?)?\s*=([^=>;][^;]*);")
        .expect("assignment pattern is valid")
});

/// `path::name(args)` or `name!(args)`, arguments without a nested `)`.
static CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:::[A-Za-z_][A-Za-z0-9_]*)*!?\s*\([^)]*\)")
        .expect("call pattern is valid")
});

/// A textual `name = expression` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    /// Right-hand side source text, trimmed
    pub expression: String,
}

/// Every `identifier = expression ;` in `text`, in source order.
pub fn extract_assignments(text: &str) -> Vec<Assignment> {
    ASSIGNMENT
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let expression = caps.get(2)?.as_str().trim();
            if expression.is_empty() {
                return None;
            }
            Some(Assignment {
                name: name.to_string(),
                expression: expression.to_string(),
            })
        })
        .collect()
}

/// Call-like expressions in `text`, de-duplicated in first-seen order.
pub fn extract_call_expressions(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    CALL.find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|call| seen.insert(call.clone()))
        .collect()
}

//! Depth-limited text rendering of serializable values

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

/// Render `value` for a log record, expanding at most `max_depth` levels of
/// containers. Never fails: an unserializable value becomes a placeholder.
pub fn render<T: Serialize + ?Sized>(value: &T, max_depth: usize) -> String {
    match serde_json::to_value(value) {
        Ok(value) => render_value(&value, max_depth),
        Err(err) => {
            tracing::debug!(error = %err, "Value could not be serialized for dumping");
            format!("<unserializable: {err}>")
        }
    }
}

/// Render an already converted JSON value.
pub fn render_value(value: &Value, max_depth: usize) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 1, max_depth);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize, max_depth: usize) {
    match value {
        Value::Array(items) => {
            if depth > max_depth {
                let _ = write!(out, "array:{} […]", items.len());
                return;
            }
            if items.is_empty() {
                out.push_str("array:0 []");
                return;
            }
            let _ = writeln!(out, "array:{} [", items.len());
            let indent = "  ".repeat(depth);
            for (i, item) in items.iter().enumerate() {
                let _ = write!(out, "{indent}{i} => ");
                write_value(out, item, depth + 1, max_depth);
                out.push('\n');
            }
            let _ = write!(out, "{}]", "  ".repeat(depth - 1));
        }
        Value::Object(map) => {
            if depth > max_depth {
                let _ = write!(out, "map:{} {{…}}", map.len());
                return;
            }
            if map.is_empty() {
                out.push_str("map:0 {}");
                return;
            }
            let _ = writeln!(out, "map:{} {{", map.len());
            let indent = "  ".repeat(depth);
            for (key, item) in map {
                let _ = write!(out, "{indent}{} => ", Value::from(key.as_str()));
                write_value(out, item, depth + 1, max_depth);
                out.push('\n');
            }
            let _ = write!(out, "{}}}", "  ".repeat(depth - 1));
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

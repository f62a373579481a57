//! Log records: a subject plus ordered, optionally nested fields

use std::fmt::Write as _;

/// Width of the dashed line closing every record.
pub const SEPARATOR_WIDTH: usize = 50;

/// A field value: text, or a nested mapping rendered as an indented block.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Map(Vec<(String, FieldValue)>),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FieldValue::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One append-only log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub subject: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl LogRecord {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Render the record under a pre-formatted timestamp.
    ///
    /// ```text
    /// [2024-03-01 12:30:45.123456] Test
    ///   A: 1
    ///   B:
    ///     C: 2
    /// --------------------------------------------------
    /// ```
    pub fn render(&self, timestamp: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[{timestamp}] {}", self.subject);
        render_fields(&mut out, &self.fields, 1);
        out.push_str(&"-".repeat(SEPARATOR_WIDTH));
        out.push('\n');
        out
    }
}

fn render_fields(out: &mut String, fields: &[(String, FieldValue)], level: usize) {
    let indent = "  ".repeat(level);
    for (key, value) in fields {
        match value {
            FieldValue::Text(text) => {
                let _ = writeln!(out, "{indent}{key}: {text}");
            }
            FieldValue::Map(entries) => {
                let _ = writeln!(out, "{indent}{key}:");
                render_fields(out, entries, level + 1);
            }
        }
    }
}

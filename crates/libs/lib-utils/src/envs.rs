//! # Environment Variables
//!
//! Utilities for reading and parsing environment variables.

use std::env;

/// Get an environment variable by name.
pub fn get_env(name: &str) -> Result<String, Error> {
    env::var(name).map_err(|_| Error::MissingEnv(name.to_string()))
}

/// Interpret a boolean-ish flag value.
///
/// Accepts `1/0`, `true/false`, `yes/no` and `on/off` (case-insensitive).
/// Anything else is `None` so callers can fall back to their default.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// region:    --- Error
#[derive(Debug)]
pub enum Error {
    MissingEnv(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
// endregion: --- Error

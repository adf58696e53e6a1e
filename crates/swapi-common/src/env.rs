//! Typed environment variable readers
//!
//! Every configuration section in the workspace is loaded from the process
//! environment. These helpers keep the "default unless set, error when set to
//! garbage" rule in one place.

use std::str::FromStr;

use crate::error::{Result, SwapiError};

/// Read a variable, treating empty values as unset.
pub fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read a variable that must be present.
pub fn required(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| SwapiError::MissingVar(name.to_string()))
}

/// Read a variable or fall back to `default`.
pub fn or_default(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

/// Parse a variable, falling back to `default` when unset.
///
/// A value that is set but does not parse is an error rather than a silent
/// fallback.
pub fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| SwapiError::invalid_var(name, raw.clone(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn flag_or(name: &str, default: bool) -> Result<bool> {
    match optional(name) {
        Some(raw) => parse_flag(&raw).ok_or_else(|| {
            SwapiError::invalid_var(name, raw.clone(), "expected a boolean")
        }),
        None => Ok(default),
    }
}

/// Parse a boolean in the forms accepted by [`flag_or`].
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

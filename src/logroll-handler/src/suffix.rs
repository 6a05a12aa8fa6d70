//! Date suffixes for time-rotated backups.
//!
//! Backups are pruned by sorting their names, so every accepted format must
//! render fixed-width, zero-padded fields. Only the chrono specifiers that do
//! so are allowed; anything else is rejected when the writer is configured.

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{Result, RotateError};

/// Default suffix format for day rotation.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Formats and recognizes the date suffix of a time-rotated backup.
#[derive(Debug, Clone)]
pub struct DateSuffix {
    format: String,
    matcher: Regex,
}

impl DateSuffix {
    pub fn new(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        let pattern = format_to_pattern(&format)?;
        // Backups compressed by an external tool keep one extra `.ext` token.
        let matcher = Regex::new(&format!(r"^{pattern}(\.\w+)?$"))
            .map_err(|e| RotateError::InvalidConfig(format!("date format {format:?}: {e}")))?;
        Ok(Self { format, matcher })
    }

    pub fn format_str(&self) -> &str {
        &self.format
    }

    /// Render the suffix for a local wall-clock reading.
    pub fn render(&self, local: NaiveDateTime) -> String {
        local.format(&self.format).to_string()
    }

    /// Whether `suffix` (the part after `basename.`) names a backup.
    pub fn matches(&self, suffix: &str) -> bool {
        self.matcher.is_match(suffix)
    }
}

fn format_to_pattern(format: &str) -> Result<String> {
    if format.is_empty() {
        return Err(RotateError::InvalidConfig(
            "date format must not be empty".to_string(),
        ));
    }
    if format.contains(['/', '\\']) {
        return Err(RotateError::InvalidConfig(format!(
            "date format {format:?} must not contain path separators"
        )));
    }

    let mut pattern = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            continue;
        }
        match chars.next() {
            Some('Y') => pattern.push_str(r"\d{4}"),
            Some('m' | 'd' | 'H' | 'M' | 'S') => pattern.push_str(r"\d{2}"),
            Some('%') => pattern.push('%'),
            Some(other) => {
                return Err(RotateError::InvalidConfig(format!(
                    "date format {format:?}: %{other} is not a fixed-width field"
                )));
            }
            None => {
                return Err(RotateError::InvalidConfig(format!(
                    "date format {format:?} ends with a dangling %"
                )));
            }
        }
    }
    Ok(pattern)
}

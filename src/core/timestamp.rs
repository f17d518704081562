//! Timestamp formatting utilities
//!
//! The wire format uses a space-separated date and time with millisecond
//! resolution. Other strftime layouts are available for custom templates.

use super::error::{Result, RuntimeError};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Timestamp layout used when rendering the `{timestamp}` placeholder
///
/// # Examples
///
/// ```
/// use rust_worker_logger::core::TimestampFormat;
/// use chrono::Utc;
///
/// let stamp = TimestampFormat::default().format(&Utc::now());
/// // e.g. "2018-10-08 21:08:31.633"
/// assert_eq!(stamp.len(), 23);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2018-10-08 21:08:31.633`
    #[default]
    Millis,

    /// `2018-10-08 21:08:31.633123`
    Micros,

    /// ISO 8601 with milliseconds: `2018-10-08T21:08:31.633Z`
    Iso8601,

    /// Custom strftime format
    Custom(String),
}

impl TimestampFormat {
    fn pattern(&self) -> &str {
        match self {
            TimestampFormat::Millis => "%Y-%m-%d %H:%M:%S%.3f",
            TimestampFormat::Micros => "%Y-%m-%d %H:%M:%S%.6f",
            TimestampFormat::Iso8601 => "%Y-%m-%dT%H:%M:%S%.3fZ",
            TimestampFormat::Custom(pattern) => pattern,
        }
    }

    /// Reject custom patterns chrono cannot render
    pub fn validate(&self) -> Result<()> {
        if StrftimeItems::new(self.pattern()).any(|item| matches!(item, Item::Error)) {
            return Err(RuntimeError::config(
                "TimestampFormat",
                format!("invalid strftime pattern '{}'", self.pattern()),
            ));
        }
        Ok(())
    }

    /// Format a `DateTime<Utc>` according to this format
    ///
    /// An unrenderable custom pattern falls back to the default layout.
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        let mut out = String::new();
        if write!(out, "{}", datetime.format(self.pattern())).is_err() {
            out.clear();
            let _ = write!(out, "{}", datetime.format(TimestampFormat::Millis.pattern()));
        }
        out
    }

    /// Parse a rendered timestamp back into UTC
    ///
    /// Only layouts carrying a full date and time can be parsed.
    pub fn parse(&self, text: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(text, self.pattern())
            .ok()
            .map(|naive| naive.and_utc())
    }
}

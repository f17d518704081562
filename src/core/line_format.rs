//! Line template used by every sink
//!
//! A template is a string with `{placeholder}` fields:
//!
//! | Placeholder    | Rendered as                                   |
//! |----------------|-----------------------------------------------|
//! | `{timestamp}`  | event time, see [`TimestampFormat`]           |
//! | `{thread}`     | numeric thread id, zero-padded to 6 digits    |
//! | `{level}`      | severity letter (`T D I W E C`)               |
//! | `{level_name}` | severity name (`INFO`, `WARN`, ...)           |
//! | `{logger}`     | logger name, empty when unnamed               |
//! | `{message}`    | message text                                  |
//!
//! The default template produces the wire format
//! `2018-10-08 21:08:31.633|020288|I|Thread Worker thread 3 doing something`.

use super::error::{Result, RuntimeError};
use super::log_entry::LogEntry;
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

pub const DEFAULT_TEMPLATE: &str = "{timestamp}|{thread}|{level}|{message}";

const FIELD_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Timestamp,
    Thread,
    Level,
    LevelName,
    Logger,
    Message,
}

/// Compiled line template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFormat {
    template: String,
    segments: Vec<Segment>,
    timestamp_format: TimestampFormat,
}

impl LineFormat {
    /// Compile a template
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for unknown or unterminated placeholders.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = Self::compile(&template)?;
        Ok(Self {
            template,
            segments,
            timestamp_format: TimestampFormat::default(),
        })
    }

    /// Render `{timestamp}` with another layout
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a custom pattern chrono cannot render.
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Result<Self> {
        format.validate()?;
        self.timestamp_format = format;
        Ok(self)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    fn compile(template: &str) -> Result<Vec<Segment>> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                RuntimeError::config("LineFormat", format!("unterminated placeholder in '{}'", template))
            })?;

            let segment = match &after[..close] {
                "timestamp" => Segment::Timestamp,
                "thread" => Segment::Thread,
                "level" => Segment::Level,
                "level_name" => Segment::LevelName,
                "logger" => Segment::Logger,
                "message" => Segment::Message,
                other => {
                    return Err(RuntimeError::config(
                        "LineFormat",
                        format!("unknown placeholder '{{{}}}'", other),
                    ))
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    /// Render an entry as one line, without the trailing newline
    pub fn render(&self, entry: &LogEntry) -> String {
        self.render_with_level(entry, None)
    }

    /// Render with a replacement for the `{level}` field (used for colouring)
    pub fn render_with_level(&self, entry: &LogEntry, level: Option<&str>) -> String {
        let mut line = String::with_capacity(64 + entry.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Timestamp => line.push_str(&self.timestamp_format.format(&entry.timestamp)),
                Segment::Thread => {
                    let _ = write!(line, "{:06}", entry.thread_id);
                }
                Segment::Level => match level {
                    Some(styled) => line.push_str(styled),
                    None => line.push(entry.level.letter()),
                },
                Segment::LevelName => line.push_str(entry.level.to_str()),
                Segment::Logger => line.push_str(entry.logger.as_deref().unwrap_or("")),
                Segment::Message => line.push_str(&entry.message),
            }
        }
        line
    }
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            segments: vec![
                Segment::Timestamp,
                Segment::Literal(FIELD_SEPARATOR.to_string()),
                Segment::Thread,
                Segment::Literal(FIELD_SEPARATOR.to_string()),
                Segment::Level,
                Segment::Literal(FIELD_SEPARATOR.to_string()),
                Segment::Message,
            ],
            timestamp_format: TimestampFormat::default(),
        }
    }
}

/// A line of the default wire format, parsed back into its fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub thread: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogLine {
    /// Parse `<timestamp>|<thread>|<letter>|<message>`
    ///
    /// The message is the remainder of the line and may itself contain `|`.
    pub fn parse(line: &str) -> Result<Self> {
        Self::parse_with(line, &TimestampFormat::default())
    }

    pub fn parse_with(line: &str, timestamp_format: &TimestampFormat) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.splitn(4, FIELD_SEPARATOR);
        let (Some(stamp), Some(thread), Some(letter), Some(message)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(RuntimeError::line_parse(line, "expected 4 '|'-separated fields"));
        };

        let timestamp = timestamp_format
            .parse(stamp)
            .ok_or_else(|| RuntimeError::line_parse(line, format!("bad timestamp '{}'", stamp)))?;

        let mut letters = letter.chars();
        let level = match (letters.next(), letters.next()) {
            (Some(c), None) => LogLevel::from_letter(c),
            _ => None,
        }
        .ok_or_else(|| RuntimeError::line_parse(line, format!("bad severity letter '{}'", letter)))?;

        Ok(Self {
            timestamp,
            thread: thread.to_string(),
            level,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry() -> LogEntry {
        let mut entry = LogEntry::new(LogLevel::Info, "Thread Worker thread 3 doing something");
        entry.timestamp = Utc
            .with_ymd_and_hms(2018, 10, 8, 21, 8, 31)
            .single()
            .unwrap()
            + chrono::Duration::milliseconds(633);
        entry.thread_id = 20288;
        entry
    }

    #[test]
    fn test_default_wire_format() {
        let line = LineFormat::default().render(&sample_entry());
        assert_eq!(
            line,
            "2018-10-08 21:08:31.633|020288|I|Thread Worker thread 3 doing something"
        );
    }

    #[test]
    fn test_compiled_default_matches_builtin() {
        assert_eq!(LineFormat::new(DEFAULT_TEMPLATE).unwrap(), LineFormat::default());
    }

    #[test]
    fn test_custom_template() {
        let format = LineFormat::new("[{level_name}] {logger}: {message}").unwrap();
        let entry = sample_entry().with_logger(Some("main"));
        assert_eq!(
            format.render(&entry),
            "[INFO] main: Thread Worker thread 3 doing something"
        );
    }

    #[test]
    fn test_invalid_templates() {
        assert!(LineFormat::new("{timestamp}|{bogus}").is_err());
        assert!(LineFormat::new("{timestamp").is_err());
    }

    #[test]
    fn test_timestamp_format_checked_up_front() {
        let bad = LineFormat::default().with_timestamp_format(TimestampFormat::Custom("%Q".to_string()));
        assert!(matches!(bad, Err(RuntimeError::InvalidConfiguration { .. })));

        let format = LineFormat::new("{timestamp} {message}")
            .unwrap()
            .with_timestamp_format(TimestampFormat::Custom("%Y/%m/%d".to_string()))
            .unwrap();
        assert_eq!(format.render(&sample_entry()), "2018/10/08 Thread Worker thread 3 doing something");
    }

    #[test]
    fn test_parse_roundtrip() {
        let entry = sample_entry();
        let parsed = LogLine::parse(&LineFormat::default().render(&entry)).unwrap();
        assert_eq!(parsed.timestamp, entry.timestamp);
        assert_eq!(parsed.thread, "020288");
        assert_eq!(parsed.level, LogLevel::Info);
        assert_eq!(parsed.message, entry.message);
    }

    #[test]
    fn test_parse_message_with_separator() {
        let parsed = LogLine::parse("2018-10-08 21:08:31.633|000001|W|a|b|c\n").unwrap();
        assert_eq!(parsed.level, LogLevel::Warn);
        assert_eq!(parsed.message, "a|b|c");
    }

    #[test]
    fn test_parse_errors() {
        assert!(LogLine::parse("no separators").is_err());
        assert!(LogLine::parse("2018-10-08 21:08:31.633|1|X|msg").is_err());
        assert!(LogLine::parse("2018-10-08 21:08:31.633|1|II|msg").is_err());
        assert!(LogLine::parse("not a time|1|I|msg").is_err());
    }
}

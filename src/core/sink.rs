//! Sink trait for log output destinations

use super::{error::Result, line_format::LineFormat, log_entry::LogEntry};

/// Output destination shared by every logger bound to it
///
/// Implementations serialize writes behind their own lock, so `write` takes
/// `&self` and may be called from any number of threads. One call writes
/// exactly one complete line.
pub trait Sink: Send + Sync {
    fn write(&self, entry: &LogEntry, format: &LineFormat) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;
}

//! In-memory sink for tests and embedding

use crate::core::{LineFormat, LogEntry, LogLevel, LogLine, Result, Sink};
use parking_lot::Mutex;

/// Records every event together with its rendered line
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<(LogEntry, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines, without trailing newlines
    pub fn lines(&self) -> Vec<String> {
        self.records.lock().iter().map(|(_, line)| line.clone()).collect()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.records.lock().iter().map(|(entry, _)| entry.clone()).collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|(entry, _)| entry.message.clone())
            .collect()
    }

    /// Lines parsed back through the wire format; lines rendered with a
    /// custom template that does not parse are skipped
    pub fn parsed_lines(&self) -> Vec<LogLine> {
        self.records
            .lock()
            .iter()
            .filter_map(|(_, line)| LogLine::parse(line).ok())
            .collect()
    }

    /// Number of recorded events whose message contains `needle`
    pub fn count_containing(&self, level: LogLevel, needle: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|(entry, _)| entry.level == level && entry.message.contains(needle))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&self, entry: &LogEntry, format: &LineFormat) -> Result<()> {
        let line = format.render(entry);
        self.records.lock().push((entry.clone(), line));
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

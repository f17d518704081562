//! Console sink implementation

use crate::core::{LineFormat, LogEntry, Result, Sink};
#[cfg(feature = "console")]
use colored::Colorize;
use parking_lot::Mutex;
use std::io::Write;

/// Writes one line per event to standard output, flushing after each line
///
/// The internal lock spans the write and the flush, so lines from concurrent
/// workers never interleave and appear in the order they acquired the lock.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    use_colors: bool,
    is_stdout: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(std::io::stdout())),
            use_colors: false,
            is_stdout: true,
        }
    }

    /// Write to an arbitrary target instead of standard output
    ///
    /// # Example
    ///
    /// ```
    /// use rust_worker_logger::sinks::ConsoleSink;
    ///
    /// let sink = ConsoleSink::with_writer(std::io::stderr());
    /// ```
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            use_colors: false,
            is_stdout: false,
        }
    }

    /// Colour the severity field with ANSI codes
    ///
    /// Only honoured when writing to standard output.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && self.is_stdout;
        self
    }

    fn render(&self, entry: &LogEntry, format: &LineFormat) -> String {
        #[cfg(feature = "console")]
        if self.use_colors {
            let styled = entry
                .level
                .letter()
                .to_string()
                .color(entry.level.color_code())
                .to_string();
            return format.render_with_level(entry, Some(&styled));
        }

        format.render(entry)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&self, entry: &LogEntry, format: &LineFormat) -> Result<()> {
        let mut line = self.render(entry, format);
        line.push('\n');

        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

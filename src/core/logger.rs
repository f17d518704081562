//! Main logger implementation

use super::{
    error::Result,
    line_format::LineFormat,
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    scoped_trace::ScopedTrace,
    sink::Sink,
};
use crate::sinks::ConsoleSink;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::sync::Arc;

/// Sink failures are reported on the first drop and then every this many drops
const FAILURE_REPORT_INTERVAL: u64 = 1000;

/// Severity-filtered front end bound to one shared [`Sink`]
///
/// Cloning a `Logger` is cheap: clones and [`child`](Logger::child) loggers
/// share the sink, the line format, the threshold and the metrics. The emit
/// path takes no lock of its own apart from a read of the threshold; writes
/// are serialized inside the sink.
#[derive(Clone)]
pub struct Logger {
    name: Option<Arc<str>>,
    min_level: Arc<RwLock<LogLevel>>,
    sink: Arc<dyn Sink>,
    format: Arc<LineFormat>,
    /// Metrics for observability (filtered count, dropped count, etc.)
    metrics: Arc<LoggerMetrics>,
}

impl Logger {
    /// Create a logger writing to `sink` at the default `Info` threshold
    #[must_use]
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            name: None,
            min_level: Arc::new(RwLock::new(LogLevel::Info)),
            sink,
            format: Arc::new(LineFormat::default()),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_worker_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .min_level(LogLevel::Debug)
    ///     .sink(MemorySink::new())
    ///     .build();
    /// logger.debug("visible");
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Logger sharing this one's sink, threshold and metrics under another name
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.name = Some(Arc::from(name.into()));
        child
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn format(&self) -> &LineFormat {
        &self.format
    }

    /// Adjust the threshold for this logger and every logger sharing it
    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= *self.min_level.read()
    }

    /// Emit one event
    ///
    /// Events below the threshold are discarded. Sink failures never reach
    /// the caller: they are counted and reported on standard error.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if !self.is_enabled(level) {
            self.metrics.record_filtered();
            return;
        }

        let entry = LogEntry::new(level, message).with_logger(self.name());
        self.dispatch(&entry);
    }

    /// Hand an entry to the sink with panic isolation
    fn dispatch(&self, entry: &LogEntry) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.sink.write(entry, &self.format)
        }));

        match result {
            Ok(Ok(())) => {
                self.metrics.record_logged();
            }
            Ok(Err(e)) => self.report_failure(Cow::Owned(e.to_string())),
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    Cow::Borrowed(*s)
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    Cow::Owned(s.clone())
                } else {
                    Cow::Borrowed("Unknown panic")
                };
                self.report_failure(Cow::Owned(format!("panicked: {}", panic_msg)));
            }
        }
    }

    fn report_failure(&self, reason: Cow<'_, str>) {
        let previous = self.metrics.record_dropped();
        let dropped = previous + 1;
        if previous == 0 || dropped % FAILURE_REPORT_INTERVAL == 0 {
            eprintln!(
                "[LOGGER ERROR] Sink '{}' failed, {} event(s) dropped so far: {}",
                self.sink.name(),
                dropped,
                reason
            );
        }
    }

    /// Get the number of events lost to sink failures
    pub fn dropped_count(&self) -> u64 {
        self.metrics.dropped_count()
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    pub fn flush(&self) -> Result<()> {
        self.sink.flush()
    }

    /// Emit paired `"<name>() Enter"` / `"<name>() Leave"` trace events
    /// around the lifetime of the returned guard
    #[must_use = "the Leave event is emitted when the guard is dropped"]
    pub fn trace_scope(&self, name: impl Into<Cow<'static, str>>) -> ScopedTrace<'_> {
        ScopedTrace::new(name, self)
    }

    #[inline]
    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Trace, message);
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Critical, message);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("min_level", &self.min_level())
            .field("sink", &self.sink.name())
            .field("template", &self.format.template())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_worker_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .name("main")
///     .min_level(LogLevel::Warn)
///     .sink(ConsoleSink::new())
///     .build();
/// assert!(!logger.is_enabled(LogLevel::Info));
/// ```
pub struct LoggerBuilder {
    name: Option<String>,
    min_level: LogLevel,
    sink: Option<Arc<dyn Sink>>,
    format: LineFormat,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            name: None,
            min_level: LogLevel::Info,
            sink: None,
            format: LineFormat::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Bind a sink owned by this logger and its clones
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Bind a sink that is already shared with other loggers
    #[must_use = "builder methods return a new value"]
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the Logger; without a sink, events go to the console
    pub fn build(self) -> Logger {
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(ConsoleSink::new()) as Arc<dyn Sink>);

        Logger {
            name: self.name.map(Arc::from),
            min_level: Arc::new(RwLock::new(self.min_level)),
            sink,
            format: Arc::new(self.format),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

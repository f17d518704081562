//! Core logger types and traits

pub mod error;
pub mod line_format;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod scoped_trace;
pub mod sink;
pub mod timestamp;

pub use error::{Result, RuntimeError};
pub use line_format::{LineFormat, LogLine, DEFAULT_TEMPLATE};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use scoped_trace::ScopedTrace;
pub use sink::Sink;
pub use timestamp::TimestampFormat;

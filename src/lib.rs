//! # Rust Worker Logger
//!
//! A pool of named worker threads doing periodic work, with cooperative
//! shutdown and a small logging pipeline behind them.
//!
//! ## Features
//!
//! - **Worker lifecycle**: timed workers that stop promptly and exactly once
//! - **Line format**: `<timestamp>|<thread>|<level>|<message>` with six severities
//! - **Sinks**: console, size-rotated files and a reconnecting TCP stream
//! - **Scope tracing**: `Enter`/`Leave` events on every exit path
//!
//! ```
//! use rust_worker_logger::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::builder().shared_sink(sink.clone()).build();
//!
//! logger.info("Begin logging");
//! let pool = WorkerPool::builder()
//!     .count(2)
//!     .interval(Duration::from_millis(10))
//!     .logger(logger.clone())
//!     .start()?;
//! std::thread::sleep(Duration::from_millis(30));
//! drop(pool);
//! logger.info("End logging");
//!
//! assert_eq!(sink.messages().last().map(String::as_str), Some("End logging"));
//! # Ok::<(), RuntimeError>(())
//! ```

pub mod config;
pub mod core;
pub mod macros;
pub mod sinks;
pub mod worker;

pub mod prelude {
    pub use crate::config::{RuntimeConfig, SinkConfig};
    pub use crate::core::{
        LineFormat, LogEntry, LogLevel, LogLine, Logger, LoggerBuilder, LoggerMetrics, Result,
        RuntimeError, ScopedTrace, Sink, TimestampFormat,
    };
    pub use crate::sinks::{ConsoleSink, MemorySink, NetworkSink, RotatingFileSink};
    pub use crate::worker::{TracedWork, WorkUnit, Worker, WorkerPool, WorkerState};
}

pub use config::{RuntimeConfig, SinkConfig};
pub use core::{
    LineFormat, LogEntry, LogLevel, LogLine, Logger, LoggerBuilder, LoggerMetrics, Result,
    RuntimeError, ScopedTrace, Sink, TimestampFormat,
};
pub use sinks::{ConsoleSink, MemorySink, NetworkSink, RotatingFileSink};
pub use worker::{StopSignal, TracedWork, WorkUnit, Worker, WorkerPool, WorkerPoolBuilder, WorkerState};

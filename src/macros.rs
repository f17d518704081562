//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`.
//!
//! # Examples
//!
//! ```
//! use rust_worker_logger::prelude::*;
//! use rust_worker_logger::info;
//!
//! let logger = Logger::builder().sink(MemorySink::new()).build();
//!
//! // Basic logging
//! info!(logger, "Begin logging");
//!
//! // With format arguments
//! let seconds = 120;
//! info!(logger, "Main thread sleeping for {} seconds", seconds);
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use rust_worker_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new()).build();
/// use rust_worker_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_worker_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new()).build();
/// use rust_worker_logger::info;
/// info!(logger, "Thread {} doing something", "Worker thread 3");
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use rust_worker_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new()).build();
/// use rust_worker_logger::critical;
/// critical!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Name of the enclosing function, without its module path
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        let name = name.trim_end_matches("::{{closure}}");
        match name.rfind("::") {
            Some(pos) => &name[pos + 2..],
            None => name,
        }
    }};
}

/// Trace entry to and exit from the current scope.
///
/// Without a name, the enclosing function's name is used. The guard lives
/// until the end of the enclosing block.
///
/// # Examples
///
/// ```
/// # use rust_worker_logger::prelude::*;
/// # use std::sync::Arc;
/// use rust_worker_logger::trace_scope;
///
/// let sink = Arc::new(MemorySink::new());
/// let logger = Logger::builder()
///     .min_level(LogLevel::Trace)
///     .shared_sink(sink.clone())
///     .build();
///
/// fn another_method(logger: &Logger) {
///     trace_scope!(logger);
/// }
///
/// another_method(&logger);
/// assert_eq!(sink.messages(), vec!["another_method() Enter", "another_method() Leave"]);
/// ```
#[macro_export]
macro_rules! trace_scope {
    ($logger:expr) => {
        let _scoped_trace = $crate::ScopedTrace::new($crate::__function_name!(), &$logger);
    };
    ($logger:expr, $name:expr) => {
        let _scoped_trace = $crate::ScopedTrace::new($name, &$logger);
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, Logger};
    use crate::sinks::MemorySink;
    use std::sync::Arc;

    fn memory_logger(level: LogLevel) -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::builder().min_level(level).shared_sink(sink.clone()).build();
        (logger, sink)
    }

    #[test]
    fn test_log_macro() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        log!(logger, LogLevel::Info, "Test message");
        log!(logger, LogLevel::Info, "Formatted: {}", 42);
        assert_eq!(sink.messages(), vec!["Test message", "Formatted: 42"]);
    }

    #[test]
    fn test_level_macros() {
        let (logger, sink) = memory_logger(LogLevel::Trace);
        trace!(logger, "t {}", 0);
        debug!(logger, "d {}", 1);
        info!(logger, "i {}", 2);
        warn!(logger, "w {}", 3);
        error!(logger, "e {}", 4);
        critical!(logger, "c {}", 5);

        let levels: Vec<LogLevel> = sink.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, LogLevel::ALL.to_vec());
    }

    #[test]
    fn test_macros_respect_threshold() {
        let (logger, sink) = memory_logger(LogLevel::Warn);
        info!(logger, "hidden");
        warn!(logger, "shown");
        assert_eq!(sink.messages(), vec!["shown"]);
    }

    #[test]
    fn test_trace_scope_uses_function_name() {
        let (logger, sink) = memory_logger(LogLevel::Trace);
        {
            trace_scope!(logger);
            info!(logger, "inside");
        }
        assert_eq!(
            sink.messages(),
            vec![
                "test_trace_scope_uses_function_name() Enter",
                "inside",
                "test_trace_scope_uses_function_name() Leave",
            ]
        );
    }

    #[test]
    fn test_trace_scope_with_name() {
        let (logger, sink) = memory_logger(LogLevel::Trace);
        {
            trace_scope!(logger, "another_method");
        }
        assert_eq!(
            sink.messages(),
            vec!["another_method() Enter", "another_method() Leave"]
        );
    }
}

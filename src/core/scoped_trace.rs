//! Enter/leave tracing around a scope

use super::logger::Logger;
use std::borrow::Cow;

/// Guard that logs `"<name>() Enter"` on creation and `"<name>() Leave"`
/// when dropped, at `Trace` severity
///
/// The leave event is emitted on every exit path, including early returns,
/// `?` propagation and unwinding panics.
///
/// # Example
///
/// ```
/// use rust_worker_logger::prelude::*;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let logger = Logger::builder()
///     .min_level(LogLevel::Trace)
///     .shared_sink(sink.clone())
///     .build();
///
/// {
///     let _trace = ScopedTrace::new("another_method", &logger);
/// }
/// let messages = sink.messages();
/// assert_eq!(messages, vec!["another_method() Enter", "another_method() Leave"]);
/// ```
pub struct ScopedTrace<'a> {
    name: Cow<'static, str>,
    logger: &'a Logger,
}

impl<'a> ScopedTrace<'a> {
    pub fn new(name: impl Into<Cow<'static, str>>, logger: &'a Logger) -> Self {
        let name = name.into();
        logger.trace(format!("{}() Enter", name));
        Self { name, logger }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ScopedTrace<'_> {
    fn drop(&mut self) {
        self.logger.trace(format!("{}() Leave", self.name));
    }
}

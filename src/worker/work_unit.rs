//! Periodic task executed by a worker

use crate::core::{Logger, Result};

/// One unit of periodic work
///
/// The worker brackets every call with a [`ScopedTrace`](crate::core::ScopedTrace)
/// named after [`name`](WorkUnit::name). Returning an error is a transient
/// failure: it is logged at `Error` and the worker keeps its schedule. A panic
/// ends the worker.
///
/// Closures taking `&Logger` implement this trait:
///
/// ```
/// use rust_worker_logger::prelude::*;
///
/// let mut counter = 0;
/// let mut work = move |logger: &Logger| -> Result<()> {
///     counter += 1;
///     logger.debug(format!("tick {}", counter));
///     Ok(())
/// };
/// let logger = Logger::builder().sink(MemorySink::new()).build();
/// work.run(&logger).unwrap();
/// ```
pub trait WorkUnit: Send {
    fn run(&mut self, logger: &Logger) -> Result<()>;

    fn name(&self) -> &str {
        "work_unit"
    }
}

impl<F> WorkUnit for F
where
    F: FnMut(&Logger) -> Result<()> + Send,
{
    fn run(&mut self, logger: &Logger) -> Result<()> {
        self(logger)
    }
}

/// Default work: nothing but the enter/leave trace pair
#[derive(Debug, Clone)]
pub struct TracedWork {
    name: String,
}

impl TracedWork {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TracedWork {
    fn default() -> Self {
        Self::new("another_method")
    }
}

impl WorkUnit for TracedWork {
    fn run(&mut self, _logger: &Logger) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

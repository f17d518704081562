//! Fixed-size pool of workers with collective shutdown

use super::handle::{Worker, WorkerState, DEFAULT_INTERVAL};
use super::work_unit::{TracedWork, WorkUnit};
use crate::core::{Logger, Result, RuntimeError};
use std::time::Duration;

type NameFn = Box<dyn Fn(usize) -> String>;
type LoggerFactory = Box<dyn Fn(&str) -> Logger>;
type WorkFactory = Box<dyn Fn(usize) -> Box<dyn WorkUnit>>;

/// Default worker name for index `i`
pub fn default_worker_name(index: usize) -> String {
    format!("Worker thread {}", index)
}

/// Owns a fixed set of [`Worker`]s started at construction
///
/// [`shutdown`](WorkerPool::shutdown) signals every worker first and only
/// then joins them, so all workers wind down in parallel. Dropping the pool
/// shuts it down; no worker outlives it.
///
/// # Example
///
/// ```
/// use rust_worker_logger::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let sink = Arc::new(MemorySink::new());
/// let logger = Logger::builder().shared_sink(sink.clone()).build();
///
/// let mut pool = WorkerPool::builder()
///     .count(3)
///     .interval(Duration::from_millis(10))
///     .logger_factory(move |name| logger.child(name))
///     .start()
///     .unwrap();
///
/// std::thread::sleep(Duration::from_millis(50));
/// pool.shutdown();
/// assert!(pool.states().iter().all(|s| *s == WorkerState::Stopped));
/// ```
pub struct WorkerPool {
    workers: Vec<Worker>,
    shut_down: bool,
}

impl WorkerPool {
    /// Start `count` workers on the default interval
    ///
    /// `name_fn` maps an index to a unique worker name and `logger_factory`
    /// yields the logger for a named worker (a shared clone or a child).
    pub fn new<N, L>(count: usize, name_fn: N, logger_factory: L) -> Result<Self>
    where
        N: Fn(usize) -> String + 'static,
        L: Fn(&str) -> Logger + 'static,
    {
        Self::builder()
            .count(count)
            .name_fn(name_fn)
            .logger_factory(logger_factory)
            .start()
    }

    #[must_use]
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::new()
    }

    /// Signal all workers, then join all of them
    ///
    /// Idempotent; later calls return immediately.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        for worker in &self.workers {
            worker.request_stop();
        }
        for worker in &mut self.workers {
            worker.join();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn names(&self) -> Vec<&str> {
        self.workers.iter().map(Worker::name).collect()
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.workers.iter().map(Worker::state).collect()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder for [`WorkerPool`]
pub struct WorkerPoolBuilder {
    count: usize,
    interval: Duration,
    name_fn: NameFn,
    logger_factory: Option<LoggerFactory>,
    work_factory: WorkFactory,
}

impl WorkerPoolBuilder {
    pub fn new() -> Self {
        Self {
            count: 1,
            interval: DEFAULT_INTERVAL,
            name_fn: Box::new(default_worker_name),
            logger_factory: None,
            work_factory: Box::new(|_| Box::new(TracedWork::default())),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Pause between work units (default 5 seconds)
    #[must_use = "builder methods return a new value"]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn name_fn<N>(mut self, name_fn: N) -> Self
    where
        N: Fn(usize) -> String + 'static,
    {
        self.name_fn = Box::new(name_fn);
        self
    }

    /// Every worker logs through a clone of `logger`
    #[must_use = "builder methods return a new value"]
    pub fn logger(self, logger: Logger) -> Self {
        self.logger_factory(move |_| logger.clone())
    }

    #[must_use = "builder methods return a new value"]
    pub fn logger_factory<L>(mut self, factory: L) -> Self
    where
        L: Fn(&str) -> Logger + 'static,
    {
        self.logger_factory = Some(Box::new(factory));
        self
    }

    /// Produce the work unit for worker `i` (default [`TracedWork`])
    #[must_use = "builder methods return a new value"]
    pub fn work_factory<W>(mut self, factory: W) -> Self
    where
        W: Fn(usize) -> Box<dyn WorkUnit> + 'static,
    {
        self.work_factory = Box::new(factory);
        self
    }

    /// Spawn every worker
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for a zero interval or duplicate names;
    /// `WorkerSpawn` if a thread cannot be created, in which case the
    /// workers already started are stopped and joined before returning.
    pub fn start(self) -> Result<WorkerPool> {
        if self.interval.is_zero() {
            return Err(RuntimeError::config("WorkerPool", "interval must be greater than zero"));
        }

        let names: Vec<String> = (0..self.count).map(|i| (self.name_fn)(i)).collect();
        let mut unique: Vec<&String> = names.iter().collect();
        unique.sort();
        unique.dedup();
        if unique.len() != names.len() {
            return Err(RuntimeError::config("WorkerPool", "worker names must be unique"));
        }

        let fallback = Logger::builder().build();
        let mut pool = WorkerPool {
            workers: Vec::with_capacity(self.count),
            shut_down: false,
        };

        for (index, name) in names.into_iter().enumerate() {
            let logger = match &self.logger_factory {
                Some(factory) => factory(&name),
                None => fallback.clone(),
            };
            let work = (self.work_factory)(index);
            pool.workers.push(Worker::spawn(name, logger, self.interval, work)?);
        }

        Ok(pool)
    }
}

impl Default for WorkerPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

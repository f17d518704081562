//! A single worker thread and its lifecycle

use super::stop_signal::StopSignal;
use super::work_unit::WorkUnit;
use crate::core::{Logger, Result, RuntimeError};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default pause between two work units
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of a worker: `Created → Running → StopRequested → Stopped`
///
/// A stop requested before the thread gets going moves `Created` straight to
/// `StopRequested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerState {
    Created = 0,
    Running = 1,
    StopRequested = 2,
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::StopRequested,
            _ => WorkerState::Stopped,
        }
    }
}

/// State shared between the worker thread and its owner
#[derive(Debug)]
struct Shared {
    name: String,
    stop: StopSignal,
    state: AtomicU8,
    iterations: AtomicU64,
}

impl Shared {
    /// Move forward to `next` unless the worker is already at or past it
    fn advance(&self, next: WorkerState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < next as u8).then_some(next as u8)
            });
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }
}

/// Named background thread running a [`WorkUnit`] on a fixed interval
pub struct Worker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start a worker thread named `name`
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawn` if the OS refuses to create the thread.
    pub fn spawn(
        name: impl Into<String>,
        logger: Logger,
        interval: Duration,
        work: Box<dyn WorkUnit>,
    ) -> Result<Self> {
        let name = name.into();
        let shared = Arc::new(Shared {
            name: name.clone(),
            stop: StopSignal::new(),
            state: AtomicU8::new(WorkerState::Created as u8),
            iterations: AtomicU64::new(0),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || Self::run(&thread_shared, &logger, interval, work))
            .map_err(|source| RuntimeError::WorkerSpawn {
                worker: name,
                source,
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    fn run(shared: &Shared, logger: &Logger, interval: Duration, mut work: Box<dyn WorkUnit>) {
        shared.advance(WorkerState::Running);
        let name = &shared.name;
        let scope: Cow<'static, str> = Cow::Owned(work.name().to_string());

        logger.trace(format!("Thread {} starting", name));

        while !shared.stop.wait_timeout(interval) {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _trace = logger.trace_scope(scope.clone());
                work.run(logger)
            }));
            shared.iterations.fetch_add(1, Ordering::Relaxed);

            match outcome {
                Ok(Ok(())) => logger.info(format!("Thread {} doing something", name)),
                Ok(Err(e)) => logger.error(format!("Thread {} work unit failed: {}", name, e)),
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        (*s).to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    logger.critical(format!(
                        "Thread {} work unit panicked: {}",
                        name, panic_msg
                    ));
                    break;
                }
            }
        }

        logger.trace(format!("Thread {} exiting", name));
        shared.advance(WorkerState::Stopped);
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Work units executed so far, failed ones included
    pub fn iterations(&self) -> u64 {
        self.shared.iterations.load(Ordering::Relaxed)
    }

    /// Signal the worker to stop; wakes it from its wait immediately
    ///
    /// Safe to call any number of times.
    pub fn request_stop(&self) {
        if self.shared.stop.request_stop() {
            self.shared.advance(WorkerState::StopRequested);
        }
    }

    /// Wait for the worker thread to finish
    ///
    /// Returns immediately if the worker was already joined.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[LOGGER ERROR] Worker '{}' thread panicked outside its work unit: {:?}",
                    self.shared.name, e
                );
            }
            self.shared.advance(WorkerState::Stopped);
        }
    }

    pub fn is_joined(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.request_stop();
        self.join();
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("iterations", &self.iterations())
            .finish()
    }
}

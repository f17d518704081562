//! Log entry structure

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);
static PROCESS_EPOCH: OnceLock<Instant> = OnceLock::new();

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Small numeric id of the calling thread, stable for the thread's lifetime
pub fn current_thread_id() -> u64 {
    THREAD_ID_CACHE.with(|id| *id)
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Monotonic time elapsed since the first event of the process
fn uptime() -> Duration {
    PROCESS_EPOCH.get_or_init(Instant::now).elapsed()
}

/// One log event, created at the emit call site and consumed by a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Monotonic offset since the process epoch
    pub uptime: Duration,
    pub thread_id: u64,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so that one event always renders as exactly one line.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: impl AsRef<str>) -> Self {
        Self {
            level,
            message: Self::sanitize_message(message.as_ref()),
            timestamp: Utc::now(),
            uptime: uptime(),
            thread_id: current_thread_id(),
            thread_name: get_thread_name(),
            logger: None,
        }
    }

    #[must_use]
    pub fn with_logger(mut self, name: Option<&str>) -> Self {
        self.logger = name.map(String::from);
        self
    }
}

//! Error types for the worker logger runtime

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Severity level that is neither a known name nor an index in 0..=5
    #[error("Invalid log level: '{0}'")]
    InvalidLevel(String),

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSink { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotation { path: String, message: String },

    /// Network sink error with remote address
    #[error("Network sink error for '{address}': {message}")]
    Network { address: String, message: String },

    /// Event discarded after the sink exhausted its retries
    #[error("Event dropped by {sink} sink after {attempts} attempt(s): {reason}")]
    EventDropped {
        sink: String,
        attempts: u32,
        reason: String,
    },

    /// The configured sink could not be opened at all
    #[error("Sink '{sink}' unavailable: {message}")]
    SinkUnavailable { sink: String, message: String },

    /// Failure raised by a worker's periodic task
    #[error("Work unit of '{worker}' failed: {message}")]
    WorkUnit { worker: String, message: String },

    /// Worker thread could not be started
    #[error("Failed to spawn worker '{worker}'")]
    WorkerSpawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    /// Line that does not follow the wire format
    #[error("Malformed log line '{line}': {message}")]
    LineParse { line: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl RuntimeError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        RuntimeError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::FileSink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::FileRotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a network sink error
    pub fn network(address: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Network {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create an error for an event given up on after bounded retries
    pub fn event_dropped(sink: impl Into<String>, attempts: u32, reason: impl Into<String>) -> Self {
        RuntimeError::EventDropped {
            sink: sink.into(),
            attempts,
            reason: reason.into(),
        }
    }

    /// Create a fatal "cannot open sink" error
    pub fn sink_unavailable(sink: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::SinkUnavailable {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a work unit failure
    pub fn work_unit(worker: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::WorkUnit {
            worker: worker.into(),
            message: message.into(),
        }
    }

    pub fn line_parse(line: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::LineParse {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RuntimeError::Other(msg.into())
    }

    /// Whether this error belongs to the configuration class
    ///
    /// Configuration errors are reported before any worker starts and map
    /// to a usage failure at the process boundary.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RuntimeError::InvalidConfiguration { .. } | RuntimeError::InvalidLevel(_)
        )
    }
}

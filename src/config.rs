//! Runtime configuration
//!
//! One [`RuntimeConfig`] describes a whole run: threshold, sink, worker
//! count and timing. It can be built in code, loaded from JSON, or filled
//! in from the command line. Sink selection happens only in
//! [`SinkConfig::open`].

use crate::core::{LineFormat, LogLevel, Logger, Result, RuntimeError, Sink};
use crate::sinks::{ConsoleSink, NetworkSink, RotatingFileSink};
use crate::worker::DEFAULT_INTERVAL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_RUN_DURATION: Duration = Duration::from_secs(120);
pub const DEFAULT_PATH_TEMPLATE: &str = "logfile_%N.txt";
pub const DEFAULT_ROTATION_SIZE: u64 = 1024;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9000;

/// Where log lines go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    #[default]
    Console,
    File {
        #[serde(default = "default_path_template")]
        path_template: String,
        #[serde(default = "default_rotation_size")]
        rotation_size: u64,
        #[serde(default)]
        max_files: Option<usize>,
        #[serde(default)]
        compress: bool,
    },
    Network {
        #[serde(default = "default_host")]
        host: String,
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default = "default_reconnect_attempts")]
        reconnect_attempts: u32,
        #[serde(default = "default_connect_timeout", with = "duration_secs")]
        connect_timeout: Duration,
    },
}

fn default_path_template() -> String {
    DEFAULT_PATH_TEMPLATE.to_string()
}

fn default_rotation_size() -> u64 {
    DEFAULT_ROTATION_SIZE
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_reconnect_attempts() -> u32 {
    crate::sinks::network::DEFAULT_RECONNECT_ATTEMPTS
}

fn default_connect_timeout() -> Duration {
    crate::sinks::network::DEFAULT_CONNECT_TIMEOUT
}

impl SinkConfig {
    /// File sink with the default retention and no compression
    pub fn file(path_template: impl Into<String>, rotation_size: u64) -> Self {
        SinkConfig::File {
            path_template: path_template.into(),
            rotation_size,
            max_files: None,
            compress: false,
        }
    }

    /// Network sink with the default retry policy
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        SinkConfig::Network {
            host: host.into(),
            port,
            reconnect_attempts: default_reconnect_attempts(),
            connect_timeout: default_connect_timeout(),
        }
    }

    /// Short kind name, as accepted by the command line
    pub fn kind(&self) -> &'static str {
        match self {
            SinkConfig::Console => "console",
            SinkConfig::File { .. } => "file",
            SinkConfig::Network { .. } => "network",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SinkConfig::Console => Ok(()),
            SinkConfig::File {
                path_template,
                rotation_size,
                max_files,
                ..
            } => {
                if path_template.is_empty() {
                    return Err(RuntimeError::config("file sink", "path template is empty"));
                }
                if *rotation_size == 0 {
                    return Err(RuntimeError::config(
                        "file sink",
                        "rotation size must be greater than zero",
                    ));
                }
                if *max_files == Some(0) {
                    return Err(RuntimeError::config("file sink", "max_files must be at least 1"));
                }
                Ok(())
            }
            SinkConfig::Network { host, port, .. } => {
                if host.trim().is_empty() {
                    return Err(RuntimeError::config("network sink", "host is empty"));
                }
                if *port == 0 {
                    return Err(RuntimeError::config("network sink", "port must be in 1..=65535"));
                }
                Ok(())
            }
        }
    }

    /// Open the configured sink
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` for bad parameters, `SinkUnavailable` when the
    /// file cannot be created or the server cannot be reached.
    pub fn open(&self) -> Result<Arc<dyn Sink>> {
        self.validate()?;

        match self {
            SinkConfig::Console => Ok(Arc::new(ConsoleSink::new())),
            SinkConfig::File {
                path_template,
                rotation_size,
                max_files,
                compress,
            } => {
                let mut sink = RotatingFileSink::new(path_template.as_str(), *rotation_size)
                    .map_err(|e| unavailable("rotating_file", e))?
                    .with_compression(*compress);
                if let Some(count) = max_files {
                    sink = sink.with_max_files(*count);
                }
                Ok(Arc::new(sink))
            }
            SinkConfig::Network {
                host,
                port,
                reconnect_attempts,
                connect_timeout,
            } => {
                let sink = NetworkSink::lazy(host, *port)
                    .with_reconnect_attempts(*reconnect_attempts)
                    .with_connect_timeout(*connect_timeout)
                    .connect()?;
                Ok(Arc::new(sink))
            }
        }
    }
}

fn unavailable(sink: &str, error: RuntimeError) -> RuntimeError {
    if error.is_config_error() {
        error
    } else {
        RuntimeError::sink_unavailable(sink, error.to_string())
    }
}

/// Everything needed for one run of the worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub level: LogLevel,
    pub sink: SinkConfig,
    pub workers: usize,
    #[serde(with = "duration_secs")]
    pub interval: Duration,
    #[serde(with = "duration_secs")]
    pub run_duration: Duration,
    /// Line template; `None` selects the default wire format
    pub pattern: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            sink: SinkConfig::Console,
            workers: DEFAULT_WORKERS,
            interval: DEFAULT_INTERVAL,
            run_duration: DEFAULT_RUN_DURATION,
            pattern: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a JSON document; missing fields take their defaults
    ///
    /// ```
    /// use rust_worker_logger::config::{RuntimeConfig, SinkConfig};
    ///
    /// let config = RuntimeConfig::from_json_str(
    ///     r#"{ "level": "debug", "workers": 3, "sink": { "type": "file" } }"#,
    /// ).unwrap();
    /// assert_eq!(config.workers, 3);
    /// assert_eq!(config.sink, SinkConfig::file("logfile_%N.txt", 1024));
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RuntimeError::config("RuntimeConfig", e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::io_operation(
                "reading configuration",
                format!("cannot read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RuntimeError::other(e.to_string()))
    }

    /// Reject values no run can work with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(RuntimeError::config("RuntimeConfig", "worker count must be at least 1"));
        }
        if self.interval.is_zero() {
            return Err(RuntimeError::config("RuntimeConfig", "interval must be greater than zero"));
        }
        if let Some(pattern) = &self.pattern {
            LineFormat::new(pattern.as_str())?;
        }
        self.sink.validate()
    }

    pub fn line_format(&self) -> Result<LineFormat> {
        match &self.pattern {
            Some(pattern) => LineFormat::new(pattern.as_str()),
            None => Ok(LineFormat::default()),
        }
    }

    /// Validate, open the sink and build the root logger
    pub fn build_logger(&self) -> Result<Logger> {
        self.validate()?;
        let sink = self.sink.open()?;
        Ok(Logger::builder()
            .min_level(self.level)
            .shared_sink(sink)
            .format(self.line_format()?)
            .build())
    }
}

/// Durations as (fractional) seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

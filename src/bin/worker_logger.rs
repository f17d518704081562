//! worker_logger - run a pool of logging workers for a fixed time
//!
//! Starts N workers that log on a timer to the chosen sink, sleeps for the
//! run duration, then shuts every worker down and exits.

use clap::{Parser, ValueEnum};
use rust_worker_logger::config::{
    RuntimeConfig, SinkConfig, DEFAULT_HOST, DEFAULT_PATH_TEMPLATE, DEFAULT_PORT,
    DEFAULT_ROTATION_SIZE,
};
use rust_worker_logger::{LogLevel, RuntimeError, WorkerPool};
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkKind {
    /// Standard output
    Console,
    /// Size-rotated files
    File,
    /// TCP stream to a log collector
    Network,
}

#[derive(Parser)]
#[command(name = "worker_logger")]
#[command(about = "Run a pool of timed workers that log to a console, file or TCP sink", long_about = None)]
struct Args {
    /// Minimum severity: trace, debug, info, warn, error, critical or 0-5 [default: info]
    #[arg(short = 'l', long, value_parser = parse_level)]
    level: Option<LogLevel>,

    /// Sink to write to [default: console]
    #[arg(short = 's', long, value_enum)]
    sink: Option<SinkKind>,

    /// File path template; %N is replaced by the rotation index [default: logfile_%N.txt]
    #[arg(short = 'f', long)]
    file: Option<String>,

    /// Rotation size in bytes [default: 1024]
    #[arg(short = 'z', long)]
    size: Option<u64>,

    /// Log collector host [default: 127.0.0.1]
    #[arg(short = 'i', long)]
    host: Option<String>,

    /// Log collector port [default: 9000]
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Number of worker threads [default: 10]
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Seconds between work units [default: 5]
    #[arg(short = 't', long)]
    interval: Option<u64>,

    /// Seconds the main thread sleeps before shutting down [default: 120]
    #[arg(short = 'd', long)]
    duration: Option<u64>,

    /// Line template, e.g. "{timestamp}|{thread}|{level}|{message}"
    #[arg(long)]
    pattern: Option<String>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

fn parse_level(value: &str) -> Result<LogLevel, String> {
    value.parse::<LogLevel>().map_err(|e| e.to_string())
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Configuration error: {0}")]
    Config(RuntimeError),

    #[error("{0}")]
    Runtime(RuntimeError),
}

impl From<RuntimeError> for CliError {
    fn from(error: RuntimeError) -> Self {
        if error.is_config_error() {
            CliError::Config(error)
        } else {
            CliError::Runtime(error)
        }
    }
}

impl CliError {
    fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        if let CliError::Runtime(RuntimeError::SinkUnavailable { sink, .. }) = self {
            if sink == "network" {
                eprintln!();
                eprintln!("Make sure a log collector is listening, e.g.: nc -lk 9000");
            }
        }
        process::exit(1)
    }
}

impl Args {
    /// Merge flags over the file configuration (or the defaults)
    fn into_config(self) -> Result<RuntimeConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::from_json_file(path)?,
            None => RuntimeConfig::default(),
        };

        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(secs) = self.interval {
            config.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.duration {
            config.run_duration = Duration::from_secs(secs);
        }
        if self.pattern.is_some() {
            config.pattern = self.pattern;
        }

        config.sink = match (self.sink, config.sink) {
            (Some(SinkKind::Console), _) => SinkConfig::Console,
            (Some(SinkKind::File), current) | (None, current @ SinkConfig::File { .. }) => {
                let mut sink = match current {
                    file @ SinkConfig::File { .. } => file,
                    _ => SinkConfig::file(DEFAULT_PATH_TEMPLATE, DEFAULT_ROTATION_SIZE),
                };
                if let SinkConfig::File {
                    path_template,
                    rotation_size,
                    ..
                } = &mut sink
                {
                    if let Some(file) = self.file {
                        *path_template = file;
                    }
                    if let Some(size) = self.size {
                        *rotation_size = size;
                    }
                }
                sink
            }
            (Some(SinkKind::Network), current) | (None, current @ SinkConfig::Network { .. }) => {
                let mut sink = match current {
                    network @ SinkConfig::Network { .. } => network,
                    _ => SinkConfig::network(DEFAULT_HOST, DEFAULT_PORT),
                };
                if let SinkConfig::Network { host, port, .. } = &mut sink {
                    if let Some(value) = self.host {
                        *host = value;
                    }
                    if let Some(value) = self.port {
                        *port = value;
                    }
                }
                sink
            }
            (None, current) => current,
        };

        config.validate()?;
        Ok(config)
    }
}

fn run(config: &RuntimeConfig) -> Result<(), CliError> {
    let logger = config.build_logger()?;

    logger.info("Begin logging");

    let root = logger.clone();
    let mut pool = WorkerPool::builder()
        .count(config.workers)
        .interval(config.interval)
        .logger_factory(move |name| root.child(name))
        .start()?;

    logger.info(format!(
        "Main thread sleeping for {} seconds",
        config.run_duration.as_secs()
    ));
    thread::sleep(config.run_duration);

    pool.shutdown();
    logger.info("End logging");
    logger.flush()?;

    let summary = logger.metrics().snapshot();
    if summary.dropped > 0 {
        eprintln!("Warning: some log events could not be delivered ({})", summary);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => e.exit(),
    };

    if let Err(e) = run(&config) {
        e.exit();
    }
}

//! Network sink for remote logging
//!
//! Streams formatted lines over one persistent TCP connection. Delivery is
//! best effort: a failed write triggers a bounded number of immediate
//! reconnect attempts, after which the event is dropped and counted and the
//! sink stops trying for a backoff window. Only one thread reconnects at a
//! time; the others drop their events instead of queueing behind it.

use crate::core::{LineFormat, LogEntry, Result, RuntimeError, Sink};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Network sink that sends lines to a remote TCP server
///
/// # Example
///
/// ```no_run
/// use rust_worker_logger::sinks::NetworkSink;
/// use rust_worker_logger::prelude::*;
///
/// let sink = NetworkSink::new("127.0.0.1", 9000)
///     .expect("Failed to connect to log server");
///
/// let logger = Logger::builder().sink(sink).build();
/// logger.info("This line is sent to 127.0.0.1:9000");
/// ```
pub struct NetworkSink {
    address: String,
    resolved: OnceLock<Vec<SocketAddr>>,
    reconnect_attempts: u32,
    connect_timeout: Duration,
    write_timeout: Duration,
    backoff: Duration,
    stream: Mutex<Option<TcpStream>>,
    /// Held by the one thread currently reconnecting
    reconnecting: Mutex<()>,
    retry_after: Mutex<Option<Instant>>,
    dropped: AtomicU64,
    connections: AtomicU64,
    connect_attempts: AtomicU64,
}

impl NetworkSink {
    /// Connect eagerly to `host:port`
    ///
    /// # Errors
    ///
    /// Returns `SinkUnavailable` if the server cannot be reached.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::lazy(host, port).connect()
    }

    /// Create the sink without connecting; the first write connects
    pub fn lazy(host: &str, port: u16) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            resolved: OnceLock::new(),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            backoff: DEFAULT_RECONNECT_BACKOFF,
            stream: Mutex::new(None),
            reconnecting: Mutex::new(()),
            retry_after: Mutex::new(None),
            dropped: AtomicU64::new(0),
            connections: AtomicU64::new(0),
            connect_attempts: AtomicU64::new(0),
        }
    }

    /// Establish the connection now instead of on the first write
    pub fn connect(self) -> Result<Self> {
        let stream = self
            .open_stream()
            .map_err(|e| RuntimeError::sink_unavailable(self.name(), e.to_string()))?;
        *self.stream.lock() = Some(stream);
        Ok(self)
    }

    /// Number of reconnect attempts after a failed write (default 3)
    #[must_use]
    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// How long to drop events without reconnecting once all attempts failed
    #[must_use]
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Socket addresses of the server, looked up once
    fn addresses(&self) -> Result<&[SocketAddr]> {
        if let Some(addrs) = self.resolved.get() {
            return Ok(addrs.as_slice());
        }
        let addrs: Vec<SocketAddr> = self
            .address
            .to_socket_addrs()
            .map_err(|e| RuntimeError::network(&self.address, format!("cannot resolve: {}", e)))?
            .collect();
        if addrs.is_empty() {
            return Err(RuntimeError::network(&self.address, "no addresses resolved"));
        }
        Ok(self.resolved.get_or_init(|| addrs).as_slice())
    }

    fn open_stream(&self) -> Result<TcpStream> {
        let mut last_error = None;
        for addr in self.addresses()? {
            self.connect_attempts.fetch_add(1, Ordering::Relaxed);
            match TcpStream::connect_timeout(addr, self.connect_timeout) {
                Ok(stream) => {
                    // Timeouts prevent a stalled peer from hanging a worker
                    stream.set_write_timeout(Some(self.write_timeout))?;
                    stream.set_nodelay(true)?;
                    self.connections.fetch_add(1, Ordering::Relaxed);
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(RuntimeError::network(
            &self.address,
            last_error.map_or_else(|| "no addresses resolved".to_string(), |e| e.to_string()),
        ))
    }

    /// Write to the live connection, if any; a failed write closes it
    fn send(&self, message: &[u8]) -> std::result::Result<(), String> {
        let mut stream = self.stream.lock();
        let Some(connected) = stream.as_mut() else {
            return Err("not connected".to_string());
        };
        if let Err(e) = connected.write_all(message) {
            // Connection lost
            *stream = None;
            return Err(e.to_string());
        }
        Ok(())
    }

    fn in_backoff(&self) -> bool {
        matches!(*self.retry_after.lock(), Some(deadline) if Instant::now() < deadline)
    }

    fn drop_event(&self, attempts: u32, reason: impl Into<String>) -> RuntimeError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        RuntimeError::event_dropped(self.name(), attempts, reason)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }

    /// Events given up on, after failed reconnects or during backoff
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Successful connections made so far, including the first
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    /// Connection attempts made so far, successful or not
    pub fn connect_attempt_count(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }
}

impl Sink for NetworkSink {
    fn write(&self, entry: &LogEntry, format: &LineFormat) -> Result<()> {
        let mut message = format.render(entry);
        message.push('\n');
        let bytes = message.as_bytes();

        let mut last_error = match self.send(bytes) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if self.in_backoff() {
            return Err(self.drop_event(0, "server unreachable, waiting before reconnecting"));
        }
        let Some(_reconnecting) = self.reconnecting.try_lock() else {
            return Err(self.drop_event(0, "reconnect in progress"));
        };
        // Another thread may have finished a reconnect or given up meanwhile
        if self.in_backoff() {
            return Err(self.drop_event(0, "server unreachable, waiting before reconnecting"));
        }
        if self.send(bytes).is_ok() {
            return Ok(());
        }

        // Connect without holding the stream lock
        let attempts = self.reconnect_attempts + 1;
        for _ in 0..attempts {
            match self.open_stream() {
                Ok(connected) => {
                    *self.stream.lock() = Some(connected);
                    *self.retry_after.lock() = None;
                    match self.send(bytes) {
                        Ok(()) => return Ok(()),
                        Err(e) => last_error = e,
                    }
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        *self.retry_after.lock() = Some(Instant::now() + self.backoff);
        Err(self.drop_event(attempts, last_error))
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut stream) = *self.stream.lock() {
            stream.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "network"
    }
}

impl Drop for NetworkSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, LogLine};
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::{mpsc, Arc};

    /// Port with nothing listening on it
    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_eager_connect_fails_without_server() {
        let result = NetworkSink::new("127.0.0.1", closed_port());
        assert!(matches!(result, Err(RuntimeError::SinkUnavailable { .. })));
    }

    #[test]
    fn test_drops_event_after_bounded_retries() {
        let sink = NetworkSink::lazy("127.0.0.1", closed_port())
            .with_reconnect_attempts(2)
            .with_connect_timeout(Duration::from_millis(200));

        let entry = LogEntry::new(LogLevel::Info, "lost");
        let result = sink.write(&entry, &LineFormat::default());

        assert!(matches!(result, Err(RuntimeError::EventDropped { attempts: 3, .. })));
        assert_eq!(sink.dropped_count(), 1);
        assert!(!sink.is_connected());
    }

    #[test]
    fn test_concurrent_emits_against_dead_peer_stay_bounded() {
        let sink = Arc::new(
            NetworkSink::lazy("127.0.0.1", closed_port())
                .with_reconnect_attempts(2)
                .with_connect_timeout(Duration::from_millis(200))
                .with_reconnect_backoff(Duration::from_secs(60)),
        );
        let format = Arc::new(LineFormat::default());

        let start = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = Arc::clone(&sink);
                let format = Arc::clone(&format);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let entry = LogEntry::new(LogLevel::Info, format!("worker {} line {}", t, i));
                        let result = sink.write(&entry, &format);
                        assert!(matches!(result, Err(RuntimeError::EventDropped { .. })));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(start.elapsed() < Duration::from_secs(2), "took {:?}", start.elapsed());
        assert_eq!(sink.dropped_count(), 200);
        // One thread made the reconnect attempts; everyone else dropped at once
        assert!(sink.connect_attempt_count() <= 3);
    }

    #[test]
    fn test_backoff_window_expires() {
        let sink = NetworkSink::lazy("127.0.0.1", closed_port())
            .with_reconnect_attempts(0)
            .with_connect_timeout(Duration::from_millis(200))
            .with_reconnect_backoff(Duration::from_millis(50));
        let format = LineFormat::default();
        let entry = LogEntry::new(LogLevel::Info, "retry later");

        let first = sink.write(&entry, &format);
        assert!(matches!(first, Err(RuntimeError::EventDropped { attempts: 1, .. })));

        let during = sink.write(&entry, &format);
        assert!(matches!(during, Err(RuntimeError::EventDropped { attempts: 0, .. })));
        assert_eq!(sink.connect_attempt_count(), 1);

        std::thread::sleep(Duration::from_millis(80));
        let after = sink.write(&entry, &format);
        assert!(matches!(after, Err(RuntimeError::EventDropped { attempts: 1, .. })));
        assert_eq!(sink.connect_attempt_count(), 2);
        assert_eq!(sink.dropped_count(), 3);
    }

    #[test]
    fn test_lines_reach_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            for line in BufReader::new(socket).lines().take(3) {
                tx.send(line.unwrap()).unwrap();
            }
        });

        let sink = NetworkSink::new("127.0.0.1", port).unwrap();
        let format = LineFormat::default();
        for i in 0..3 {
            sink.write(&LogEntry::new(LogLevel::Warn, format!("remote {}", i)), &format)
                .unwrap();
        }
        server.join().unwrap();

        let received: Vec<LogLine> = rx.iter().map(|l| LogLine::parse(&l).unwrap()).collect();
        assert_eq!(received.len(), 3);
        assert_eq!(received[2].message, "remote 2");
        assert!(received.iter().all(|l| l.level == LogLevel::Warn));
        assert_eq!(sink.connection_count(), 1);
    }

    #[test]
    fn test_reconnects_after_peer_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        let server = std::thread::spawn(move || {
            // First connection: read one line, then hang up
            let (first, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(first).read_line(&mut line).unwrap();
            tx.send(line).unwrap();

            // Second connection: report the first line seen
            let (second, _) = listener.accept().unwrap();
            let mut line = String::new();
            BufReader::new(second).read_line(&mut line).unwrap();
            tx.send(line).unwrap();
        });

        let sink = NetworkSink::new("127.0.0.1", port).unwrap();
        let format = LineFormat::default();
        sink.write(&LogEntry::new(LogLevel::Info, "before"), &format).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap().contains("before"));

        // Writes into the dead socket eventually fail and force a reconnect
        let mut reconnected = None;
        for i in 0..200 {
            let _ = sink.write(&LogEntry::new(LogLevel::Info, format!("ping {}", i)), &format);
            if let Ok(line) = rx.recv_timeout(Duration::from_millis(20)) {
                reconnected = Some(line);
                break;
            }
        }

        server.join().unwrap();
        assert!(reconnected.unwrap().contains("ping"));
        assert_eq!(sink.connection_count(), 2);
    }
}

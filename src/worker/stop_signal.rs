//! Cancellable timed wait

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::time::Duration;

/// Level-triggered stop request
///
/// Requesting a stop drops the only sender of a rendezvous channel. From
/// then on every wait, present or future, observes the disconnect and
/// returns immediately, so a stop cannot be missed no matter when it lands
/// relative to the wait.
///
/// # Example
///
/// ```
/// use rust_worker_logger::worker::StopSignal;
/// use std::time::Duration;
///
/// let signal = StopSignal::new();
/// assert!(!signal.wait_timeout(Duration::from_millis(1)));
///
/// signal.request_stop();
/// assert!(signal.wait_timeout(Duration::from_secs(60)));
/// ```
#[derive(Debug)]
pub struct StopSignal {
    trigger: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(0);
        Self {
            trigger: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Request a stop; returns `true` only for the call that made the transition
    pub fn request_stop(&self) -> bool {
        self.trigger.lock().take().is_some()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Block for at most `timeout`
    ///
    /// Returns `true` if a stop was requested before or during the wait,
    /// `false` if the full timeout elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

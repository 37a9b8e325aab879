//! Monitor Session
//!
//! State shared between the caller's thread and the worker running the
//! active strategy: the registered callback, enable flags, running flag,
//! one-shot image suppression and the stop signal.
//!
//! # Architecture
//!
//! ```text
//! ClipboardMonitor (caller thread)
//!   └─> Arc<SessionShared>
//!         ├─> callback / options / block-image flag
//!         ├─> running flag + shutdown channel
//!         └─> waker (quits a toolkit main loop)
//!
//! Worker thread
//!   └─> Delivery (one per strategy run)
//!         ├─> dedup against last delivered value
//!         ├─> one-shot image suppression
//!         └─> error log-spam suppression
//! ```

mod delivery;

pub use delivery::{Delivery, DeliveryOutcome, ErrorDisposition};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clipboard::{ClipboardValue, ContentKind};
use crate::monitor::MonitorState;

/// Callback invoked for every delivered clipboard change
pub type UpdateCallback = Arc<dyn Fn(ContentKind, ClipboardValue) + Send + Sync>;

/// Hook that interrupts a strategy blocked outside the session's control
pub type Waker = Box<dyn Fn() + Send + Sync>;

/// Which content kinds the consumer asked for
///
/// Text is always monitored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Report image changes
    pub enable_image: bool,
    /// Report file list changes
    pub enable_files: bool,
}

impl MonitorOptions {
    /// Create options from the two enable flags
    pub fn new(enable_image: bool, enable_files: bool) -> Self {
        Self {
            enable_image,
            enable_files,
        }
    }

    /// Whether content of this kind should be read and delivered
    pub fn accepts(&self, kind: ContentKind) -> bool {
        match kind {
            ContentKind::Text => true,
            ContentKind::Image => self.enable_image,
            ContentKind::Files => self.enable_files,
            ContentKind::Unknown => false,
        }
    }
}

/// Session state shared with the worker thread
pub struct SessionShared {
    options: MonitorOptions,
    callback: Mutex<Option<UpdateCallback>>,
    running: AtomicBool,
    block_image_once: AtomicBool,
    state: Mutex<MonitorState>,
    waker: Mutex<Option<Waker>>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
}

impl SessionShared {
    /// Create a running session
    pub fn new(options: MonitorOptions, callback: UpdateCallback) -> Arc<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(0);
        Arc::new(Self {
            options,
            callback: Mutex::new(Some(callback)),
            running: AtomicBool::new(true),
            block_image_once: AtomicBool::new(false),
            state: Mutex::new(MonitorState::Starting),
            waker: Mutex::new(None),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
        })
    }

    /// Enable flags the session was started with
    pub fn options(&self) -> MonitorOptions {
        self.options
    }

    /// Whether the session has not been asked to stop
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the active strategy to stop.
    ///
    /// Clears the running flag, disconnects the shutdown channel (waking any
    /// [`Delivery::sleep`]) and invokes the registered waker.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
        self.shutdown_tx.lock().take();
        if let Some(waker) = self.waker.lock().as_ref() {
            waker();
        }
    }

    /// Install or remove the waker used by [`request_stop`](Self::request_stop)
    pub fn set_waker(&self, waker: Option<Waker>) {
        *self.waker.lock() = waker;
    }

    /// Current callback, cloned out of the lock
    pub fn callback(&self) -> Option<UpdateCallback> {
        self.callback.lock().clone()
    }

    /// Drop the registered callback so nothing more is delivered
    pub fn clear_callback(&self) {
        self.callback.lock().take();
    }

    /// Arm one-shot image suppression
    pub fn arm_image_block(&self) {
        self.block_image_once.store(true, Ordering::Release);
    }

    /// Consume the one-shot image suppression flag.
    ///
    /// Returns `true` for exactly one caller per arm.
    pub fn take_image_block(&self) -> bool {
        self.block_image_once.swap(false, Ordering::AcqRel)
    }

    /// Disarm image suppression without consuming it
    pub fn clear_image_block(&self) {
        self.block_image_once.store(false, Ordering::Release);
    }

    /// Lifecycle state of this session
    pub fn state(&self) -> MonitorState {
        *self.state.lock()
    }

    /// Update the lifecycle state
    pub fn set_state(&self, state: MonitorState) {
        *self.state.lock() = state;
    }

    /// Sleep for `interval` unless the session stops first.
    ///
    /// Returns `true` if the session is still running afterwards.
    pub fn sleep(&self, interval: Duration) -> bool {
        match self.shutdown_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => self.is_running(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl fmt::Debug for SessionShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionShared")
            .field("options", &self.options)
            .field("running", &self.is_running())
            .field("state", &self.state())
            .field("has_callback", &self.callback.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn noop_session(options: MonitorOptions) -> Arc<SessionShared> {
        SessionShared::new(options, Arc::new(|_, _| {}))
    }

    #[test]
    fn test_options_accepts() {
        let options = MonitorOptions::default();
        assert!(options.accepts(ContentKind::Text));
        assert!(!options.accepts(ContentKind::Image));
        assert!(!options.accepts(ContentKind::Files));
        assert!(!options.accepts(ContentKind::Unknown));

        let options = MonitorOptions::new(true, true);
        assert!(options.accepts(ContentKind::Image));
        assert!(options.accepts(ContentKind::Files));
        assert!(!options.accepts(ContentKind::Unknown));
    }

    #[test]
    fn test_image_block_consumed_once() {
        let shared = noop_session(MonitorOptions::default());
        assert!(!shared.take_image_block());
        shared.arm_image_block();
        shared.arm_image_block();
        assert!(shared.take_image_block());
        assert!(!shared.take_image_block());
    }

    #[test]
    fn test_request_stop_runs_waker() {
        let shared = noop_session(MonitorOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        shared.set_waker(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(shared.is_running());
        shared.request_stop();
        assert!(!shared.is_running());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Repeated stop is harmless
        shared.request_stop();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_callback() {
        let shared = noop_session(MonitorOptions::default());
        assert!(shared.callback().is_some());
        shared.clear_callback();
        assert!(shared.callback().is_none());
    }
}

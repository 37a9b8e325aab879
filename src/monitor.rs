//! Clipboard Monitor
//!
//! Lifecycle manager: owns the worker thread, starts the strategy selector
//! on it, and tears everything down on [`ClipboardMonitor::stop`].
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──on_update──> Starting ──probe ok──> Active(kind) ──stop──> Stopping ──> Idle
//!                        ^                        │
//!                        └──── strategy failed ───┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use lamco_clipboard_monitor::{ClipboardMonitor, MonitorConfig};
//!
//! let monitor = ClipboardMonitor::new(MonitorConfig::default());
//! monitor.on_update(|kind, value| println!("{kind}: {}", value.summary()), true, true)?;
//! monitor.wait();
//! # Ok::<(), lamco_clipboard_monitor::MonitorError>(())
//! ```

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardValue, ContentKind, MonitorError, Result};
use crate::config::MonitorConfig;
use crate::session::{MonitorOptions, SessionShared};
use crate::strategies::{default_probes, run_strategies, StrategyKind, StrategyProbe};

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// No session
    Idle,
    /// Worker started, probing strategies
    Starting,
    /// A strategy is running
    Active(StrategyKind),
    /// Stop requested, waiting for the worker
    Stopping,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "idle"),
            MonitorState::Starting => write!(f, "starting"),
            MonitorState::Active(kind) => write!(f, "active ({kind})"),
            MonitorState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Running session and its worker
struct Worker {
    shared: Arc<SessionShared>,
    handle: JoinHandle<()>,
    /// Disconnects when the worker exits
    done_rx: Receiver<()>,
}

impl Worker {
    fn is_finished(&self) -> bool {
        matches!(self.done_rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Alive and not asked to stop
    fn accepts_updates(&self) -> bool {
        !self.is_finished() && self.shared.is_running()
    }

    fn on_current_thread(&self) -> bool {
        self.handle.thread().id() == thread::current().id()
    }

    fn exited_within(&self, timeout: Duration) -> bool {
        !matches!(self.done_rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    fn join(self) -> Result<()> {
        self.handle.join().map_err(|_| MonitorError::WorkerPanicked)
    }
}

/// Clipboard change monitor
///
/// At most one session runs at a time. Dropping the monitor stops it.
pub struct ClipboardMonitor {
    config: MonitorConfig,
    probes: Vec<Arc<dyn StrategyProbe>>,
    worker: Mutex<Option<Worker>>,
    pending_image_block: AtomicBool,
}

impl ClipboardMonitor {
    /// Monitor using the strategies listed in `config`
    pub fn new(config: MonitorConfig) -> Self {
        let probes = default_probes(&config);
        Self::with_probes(config, probes)
    }

    /// Monitor using custom capability probes, tried in order
    pub fn with_probes(config: MonitorConfig, probes: Vec<Arc<dyn StrategyProbe>>) -> Self {
        Self {
            config,
            probes,
            worker: Mutex::new(None),
            pending_image_block: AtomicBool::new(false),
        }
    }

    /// Configuration this monitor was built with
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Register `callback` and start monitoring.
    ///
    /// Returns `Ok(false)` without changing anything if a session is already
    /// running; it keeps its original callback and flags. A worker that
    /// already gave up, or is still winding down after [`stop`](Self::stop),
    /// is joined first (bounded by the stop timeout) and replaced.
    ///
    /// The GTK toolkit strategy runs on one process-wide thread, so later
    /// sessions can select it again.
    pub fn on_update<F>(&self, callback: F, enable_image: bool, enable_files: bool) -> Result<bool>
    where
        F: Fn(ContentKind, ClipboardValue) + Send + Sync + 'static,
    {
        let mut guard = self.worker.lock();

        if let Some(worker) = guard.take() {
            if worker.accepts_updates() {
                debug!("Clipboard monitor already running, keeping existing session");
                *guard = Some(worker);
                return Ok(false);
            }

            if worker.on_current_thread() {
                // Restarted from the old session's own callback
                debug!("Detaching clipboard monitor worker that is finishing its callback");
            } else {
                drop(guard);
                self.reap(worker)?;
                guard = self.worker.lock();
                if guard.is_some() {
                    debug!("Another session started while reaping, keeping it");
                    return Ok(false);
                }
            }
        }

        let options = MonitorOptions::new(enable_image, enable_files);
        let shared = SessionShared::new(options, Arc::new(callback));
        if self.pending_image_block.swap(false, Ordering::AcqRel) {
            shared.arm_image_block();
        }

        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let probes = self.probes.clone();
        let worker_shared = shared.clone();

        let handle = thread::Builder::new()
            .name("clipboard-monitor".to_string())
            .spawn(move || {
                let _done = done_tx;
                run_strategies(&probes, &worker_shared);
                worker_shared.set_state(MonitorState::Idle);
                debug!("Clipboard monitor worker exiting");
            })?;

        info!(
            "Clipboard monitor started (image: {}, files: {})",
            enable_image, enable_files
        );

        *guard = Some(Worker {
            shared,
            handle,
            done_rx,
        });
        Ok(true)
    }

    /// Join a worker that was stopped or gave up
    fn reap(&self, worker: Worker) -> Result<()> {
        worker.shared.request_stop();
        if !worker.exited_within(self.config.stop_timeout()) {
            warn!("Previous clipboard monitor worker is still running");
            let mut slot = self.worker.lock();
            if slot.is_none() {
                *slot = Some(worker);
            }
            return Err(MonitorError::JoinTimeout(self.config.stop_timeout_ms));
        }
        debug!("Reaping exited clipboard monitor worker");
        if worker.join().is_err() {
            warn!("Previous clipboard monitor worker panicked");
        }
        Ok(())
    }

    /// Stop the active strategy and join the worker.
    ///
    /// No-op when idle. Waits at most the configured stop timeout; on
    /// timeout the callback is cleared, the worker is left detached and
    /// [`MonitorError::JoinTimeout`] is returned.
    ///
    /// Called from inside the update callback, it cannot join its own
    /// thread: the session is stopped and the worker stays registered until
    /// it exits, so [`wait`](Self::wait) and the next
    /// [`on_update`](Self::on_update) still see it.
    pub fn stop(&self) -> Result<()> {
        let mut guard = self.worker.lock();
        let Some(worker) = guard.as_ref() else {
            return Ok(());
        };

        info!("Stopping clipboard monitor");
        worker.shared.set_state(MonitorState::Stopping);
        worker.shared.request_stop();

        if worker.on_current_thread() {
            debug!("Stop requested from the monitor worker itself");
            worker.shared.clear_callback();
            worker.shared.clear_image_block();
            self.pending_image_block.store(false, Ordering::Release);
            return Ok(());
        }

        let Some(worker) = guard.take() else {
            return Ok(());
        };
        drop(guard);

        let timeout = self.config.stop_timeout();
        let shared = worker.shared.clone();
        let result = if worker.exited_within(timeout) {
            worker.join()
        } else {
            warn!(
                "Clipboard monitor worker did not stop within {}ms, detaching",
                timeout.as_millis()
            );
            Err(MonitorError::JoinTimeout(self.config.stop_timeout_ms))
        };

        shared.clear_callback();
        shared.clear_image_block();
        shared.set_state(MonitorState::Idle);
        self.pending_image_block.store(false, Ordering::Release);

        if result.is_ok() {
            info!("Clipboard monitor stopped");
        }
        result
    }

    /// Block until the worker exits. Returns at once when idle.
    pub fn wait(&self) {
        let done_rx = match self.worker.lock().as_ref() {
            Some(worker) => worker.done_rx.clone(),
            None => return,
        };
        // Only ever disconnects
        let _ = done_rx.recv();
    }

    /// Suppress the next image change.
    ///
    /// For callers about to write an image to the clipboard themselves.
    /// Arming again before an image arrives still suppresses only one.
    pub fn enable_block_image_once(&self) {
        match self.worker.lock().as_ref() {
            Some(worker) if worker.accepts_updates() => worker.shared.arm_image_block(),
            _ => self.pending_image_block.store(true, Ordering::Release),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        match self.worker.lock().as_ref() {
            Some(worker) if !worker.is_finished() => worker.shared.state(),
            _ => MonitorState::Idle,
        }
    }

    /// Strategy currently observing the clipboard
    pub fn active_strategy(&self) -> Option<StrategyKind> {
        match self.state() {
            MonitorState::Active(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether a worker is alive
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}

impl Drop for ClipboardMonitor {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Clipboard monitor did not stop cleanly: {}", e);
        }
    }
}

impl fmt::Debug for ClipboardMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardMonitor")
            .field("state", &self.state())
            .field("probes", &self.probes.iter().map(|p| p.kind()).collect::<Vec<_>>())
            .finish()
    }
}

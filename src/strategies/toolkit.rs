//! Toolkit Strategy
//!
//! Event-bound observation through the GTK clipboard object: subscribe to
//! `owner-change` and query the clipboard synchronously on every event. Only
//! usable when GDK runs on its X11 backend; Wayland sessions are served by
//! the data-control strategy instead.
//!
//! The per-event logic lives in [`OwnerChangeHandler`], which works against
//! the [`ToolkitClipboard`] trait so it can run without a display. The GTK
//! backend is compiled with the `gtk` feature.
//!
//! GTK binds itself to the thread that initialises it, while every session
//! gets a fresh worker. All GTK work therefore runs on one process-wide
//! [`ToolkitThread`]; the session worker blocks until its listener returns.

use crossbeam_channel::Sender;
use std::thread;
use tracing::debug;

use super::{Availability, StrategyKind, StrategyProbe};
use crate::clipboard::mime::PNG_MIME;
use crate::clipboard::{ClipboardValue, MonitorError, Result};
use crate::session::{Delivery, DeliveryOutcome, MonitorOptions};

type Job = Box<dyn FnOnce() + Send>;

/// Long-lived thread that runs toolkit jobs in submission order
#[derive(Clone)]
pub struct ToolkitThread {
    name: String,
    jobs: Sender<Job>,
}

impl ToolkitThread {
    /// Spawn the thread. It exits once every handle is dropped.
    pub fn spawn(name: &str) -> Result<Self> {
        let (jobs, queue) = crossbeam_channel::unbounded::<Job>();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in queue {
                    job();
                }
            })?;
        Ok(Self {
            name: name.to_string(),
            jobs,
        })
    }

    /// Run `job` on the toolkit thread and wait for its result.
    ///
    /// A panicking job takes the thread down; this and every later call
    /// then fail with [`MonitorError::Toolkit`].
    pub fn run<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.jobs
            .send(Box::new(move || {
                let _ = reply_tx.send(job());
            }))
            .map_err(|_| MonitorError::Toolkit(format!("{} thread is gone", self.name)))?;
        reply_rx
            .recv()
            .map_err(|_| MonitorError::Toolkit(format!("{} job did not complete", self.name)))
    }
}

impl std::fmt::Debug for ToolkitThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolkitThread").field("name", &self.name).finish()
    }
}

/// Synchronous clipboard queries offered by a toolkit
pub trait ToolkitClipboard {
    /// Image handle returned by [`wait_for_image`](Self::wait_for_image)
    type Image: ToolkitImage;

    /// URIs on the clipboard, empty if none
    fn wait_for_uris(&self) -> Vec<String>;

    /// Clipboard text, if any
    fn wait_for_text(&self) -> Option<String>;

    /// Clipboard image, if any
    fn wait_for_image(&self) -> Option<Self::Image>;
}

/// Toolkit image that can be encoded for delivery
pub trait ToolkitImage {
    /// Encode as PNG
    fn encode_png(&self) -> Result<Vec<u8>>;
}

/// Reacts to clipboard owner changes
///
/// Priority per event: files (when enabled), then non-empty text, then an
/// image (when enabled). An image arriving while suppression is armed is
/// dropped before it is encoded.
pub struct OwnerChangeHandler {
    delivery: Delivery,
}

impl OwnerChangeHandler {
    /// Handler delivering through `delivery`
    pub fn new(delivery: Delivery) -> Self {
        Self { delivery }
    }

    /// Delivery state of this handler
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Handle one owner-change event
    pub fn handle<C: ToolkitClipboard + ?Sized>(&mut self, clipboard: &C) -> Option<DeliveryOutcome> {
        let options = self.delivery.options();

        if options.enable_files {
            let uris: Vec<String> = clipboard
                .wait_for_uris()
                .into_iter()
                .map(|uri| uri.trim().to_string())
                .filter(|uri| !uri.is_empty())
                .collect();
            if !uris.is_empty() {
                return Some(self.delivery.deliver(ClipboardValue::Files(uris)));
            }
        }

        if let Some(text) = clipboard.wait_for_text().filter(|text| !text.is_empty()) {
            return Some(self.delivery.deliver(ClipboardValue::Text(text)));
        }

        if options.enable_image {
            let image = clipboard.wait_for_image()?;
            if self.delivery.take_image_block() {
                debug!("Clipboard image suppressed (block-image-once)");
                return Some(DeliveryOutcome::Suppressed);
            }
            return match image.encode_png() {
                Ok(data) => Some(self.delivery.deliver(ClipboardValue::Image {
                    data,
                    mime_type: PNG_MIME.to_string(),
                })),
                Err(e) => {
                    self.delivery.report_error("Failed to encode clipboard image", &e);
                    None
                }
            };
        }

        None
    }
}

/// Probe for the toolkit strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolkitProbe;

impl StrategyProbe for ToolkitProbe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Toolkit
    }

    #[cfg(feature = "gtk")]
    fn probe(&self, _options: &MonitorOptions) -> Availability {
        let thread = match gtk_backend::gtk_thread() {
            Ok(thread) => thread,
            Err(e) => return Availability::unavailable(StrategyKind::Toolkit, e.to_string()),
        };
        match thread.run(gtk_backend::open) {
            Ok(Ok(())) => Availability::Ready(Box::new(gtk_backend::GtkStrategy::new(thread))),
            Ok(Err(reason)) => Availability::unavailable(StrategyKind::Toolkit, reason),
            Err(e) => Availability::unavailable(StrategyKind::Toolkit, e.to_string()),
        }
    }

    #[cfg(not(feature = "gtk"))]
    fn probe(&self, _options: &MonitorOptions) -> Availability {
        Availability::unavailable(StrategyKind::Toolkit, "built without the `gtk` feature")
    }
}

#[cfg(feature = "gtk")]
mod gtk_backend {
    use gtk::gdk_pixbuf::Pixbuf;
    use gtk::prelude::*;
    use gtk::{gdk, glib};
    use parking_lot::Mutex;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing::{debug, info};

    use super::{OwnerChangeHandler, ToolkitClipboard, ToolkitImage, ToolkitThread};
    use crate::clipboard::{MonitorError, Result};
    use crate::session::Delivery;
    use crate::strategies::{ClipboardStrategy, StrategyKind};

    static GTK_THREAD: Mutex<Option<ToolkitThread>> = Mutex::new(None);

    /// The process-wide GTK thread, spawned on first use
    pub(super) fn gtk_thread() -> Result<ToolkitThread> {
        let mut slot = GTK_THREAD.lock();
        if let Some(thread) = slot.as_ref() {
            return Ok(thread.clone());
        }
        let thread = ToolkitThread::spawn("gtk-clipboard")?;
        *slot = Some(thread.clone());
        Ok(thread)
    }

    pub(super) struct GtkClipboard(gtk::Clipboard);

    impl ToolkitClipboard for GtkClipboard {
        type Image = Pixbuf;

        fn wait_for_uris(&self) -> Vec<String> {
            self.0
                .wait_for_uris()
                .into_iter()
                .map(|uri| uri.to_string())
                .collect()
        }

        fn wait_for_text(&self) -> Option<String> {
            self.0.wait_for_text().map(|text| text.to_string())
        }

        fn wait_for_image(&self) -> Option<Pixbuf> {
            self.0.wait_for_image()
        }
    }

    impl ToolkitImage for Pixbuf {
        fn encode_png(&self) -> Result<Vec<u8>> {
            self.save_to_bufferv("png", &[])
                .map_err(|e| MonitorError::Toolkit(format!("PNG encoding failed: {e}")))
        }
    }

    /// Initialise GTK on this thread and check for the X11 backend
    pub(super) fn open() -> std::result::Result<(), String> {
        if gtk::is_initialized() && !gtk::is_initialized_main_thread() {
            return Err("GTK is already initialised on another thread".to_string());
        }
        gtk::init().map_err(|e| format!("GTK init failed: {e}"))?;

        let display = gdk::Display::default().ok_or("no default GDK display")?;
        let backend = display.type_().name();
        if !backend.to_ascii_lowercase().contains("x11") {
            return Err(format!("unsupported GDK backend {backend}"));
        }

        debug!("GDK backend {} supports owner-change", backend);
        Ok(())
    }

    /// Run the owner-change listener until the session stops.
    ///
    /// Must run on the thread that initialised GTK.
    fn listen(delivery: Delivery) -> Result<()> {
        let session = delivery.session().clone();
        session.set_waker(Some(Box::new(|| {
            glib::idle_add(|| {
                gtk::main_quit();
                glib::ControlFlow::Break
            });
        })));
        if !session.is_running() {
            return Ok(());
        }

        let clipboard = gtk::Clipboard::get(&gdk::SELECTION_CLIPBOARD);
        let handler = Rc::new(RefCell::new(OwnerChangeHandler::new(delivery)));
        let signal = clipboard.connect_owner_change(move |clipboard, _event| {
            // wait_for_* spins a nested main loop that may re-emit owner-change
            let Ok(mut handler) = handler.try_borrow_mut() else {
                debug!("Owner change while busy, skipped");
                return;
            };
            handler.handle(&GtkClipboard(clipboard.clone()));
        });

        info!("GTK clipboard owner-change listener running");
        gtk::main();

        clipboard.disconnect(signal);
        debug!("GTK main loop exited");
        Ok(())
    }

    pub(super) struct GtkStrategy {
        thread: ToolkitThread,
    }

    impl GtkStrategy {
        pub(super) fn new(thread: ToolkitThread) -> Self {
            Self { thread }
        }
    }

    impl ClipboardStrategy for GtkStrategy {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Toolkit
        }

        fn run(self: Box<Self>, delivery: Delivery) -> Result<()> {
            self.thread.run(move || listen(delivery))?
        }
    }
}

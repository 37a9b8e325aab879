//! # lamco-clipboard-monitor
//!
//! Clipboard change monitor for Linux desktops.
//!
//! Reports every new clipboard value (text, image or file list) to a
//! callback, using the best mechanism the session offers:
//!
//! 1. **Data-control**: `ext-data-control-v1` or `zwlr_data_control_v1` on
//!    Wayland compositors that expose them. Event driven.
//! 2. **Toolkit**: GTK owner-change signal on X11 (`gtk` feature).
//! 3. **Polling**: `xclip` or `wl-paste` queried on an interval.
//!
//! # Architecture
//!
//! ```text
//! ClipboardMonitor (lifecycle, worker thread)
//!   └─> Strategy selector (probe in order, fall back on failure)
//!         ├─> DataControlStrategy ─┐
//!         ├─> GtkStrategy         ─┼─> receive_value ─> Delivery ─> callback
//!         └─> PollingStrategy     ─┘        (MIME)      (dedup, image block)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Content model, MIME classification and errors
pub mod clipboard;

/// Configuration
pub mod config;

/// Monitor lifecycle
pub mod monitor;

/// Per-session shared state and delivery rules
pub mod session;

/// Change observation strategies
pub mod strategies;

/// Diagnostics
pub mod utils;

pub use clipboard::{ClipboardValue, ContentKind, MonitorError, Result};
pub use config::MonitorConfig;
pub use monitor::{ClipboardMonitor, MonitorState};
pub use strategies::StrategyKind;

//! Utility Functions and Diagnostics
//!
//! Host and display-session reporting used at startup.
//!
//! ```rust,no_run
//! use lamco_clipboard_monitor::utils::{log_startup_diagnostics, DisplayEnvironment};
//!
//! log_startup_diagnostics();
//!
//! if !DisplayEnvironment::detect().is_wayland() {
//!     println!("data-control needs a Wayland session");
//! }
//! ```

pub mod diagnostics;

pub use diagnostics::{find_in_path, log_startup_diagnostics, DisplayEnvironment, SystemInfo};

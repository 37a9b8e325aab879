//! Clipboard Monitoring Strategies
//!
//! Three mutually exclusive ways of observing the clipboard, tried in order:
//!
//! 1. **Data-control** - native Wayland protocol client, event driven
//! 2. **Toolkit** - GTK owner-change listener, X11 sessions only
//! 3. **Polling** - periodic `xclip` / `wl-paste` invocations, always available
//!
//! Each strategy is reached through a [`StrategyProbe`] that checks its
//! prerequisites and hands back a ready [`ClipboardStrategy`], or the reason
//! it cannot run. The [`selector`] walks the probe list on the worker thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clipboard::{MonitorError, Result};
use crate::session::{Delivery, MonitorOptions};

pub mod data_control;
pub mod polling;
pub mod selector;
pub mod toolkit;

pub use data_control::DataControlProbe;
pub use polling::PollingProbe;
pub use selector::{default_probes, run_strategies};
pub use toolkit::ToolkitProbe;

/// Strategy identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Wayland data-control protocol client
    DataControl,
    /// Toolkit owner-change listener
    Toolkit,
    /// External CLI polling
    Polling,
}

impl StrategyKind {
    /// All strategies in default fallback order
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::DataControl,
        StrategyKind::Toolkit,
        StrategyKind::Polling,
    ];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DataControl => "data-control",
            StrategyKind::Toolkit => "toolkit",
            StrategyKind::Polling => "polling",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown strategy '{s}' (expected data-control, toolkit or polling)")
            })
    }
}

/// Result of probing a strategy
pub enum Availability {
    /// Prerequisites met, strategy is ready to run
    Ready(Box<dyn ClipboardStrategy>),
    /// Strategy cannot run here
    Unavailable(MonitorError),
}

impl Availability {
    /// `strategy` cannot run, for `reason`
    pub fn unavailable(strategy: StrategyKind, reason: impl Into<String>) -> Self {
        Availability::Unavailable(MonitorError::Unavailable {
            strategy,
            reason: reason.into(),
        })
    }
}

impl fmt::Debug for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Ready(strategy) => write!(f, "Ready({})", strategy.kind()),
            Availability::Unavailable(err) => write!(f, "Unavailable({err})"),
        }
    }
}

/// Capability check for one strategy
///
/// Probes are shared with the caller's thread, but [`probe`](Self::probe)
/// always runs on the worker thread, so the strategy it returns may hold
/// thread-bound resources.
pub trait StrategyProbe: Send + Sync {
    /// Strategy this probe checks
    fn kind(&self) -> StrategyKind;

    /// Check prerequisites and build the strategy
    fn probe(&self, options: &MonitorOptions) -> Availability;
}

/// A ready-to-run monitoring strategy
pub trait ClipboardStrategy {
    /// Strategy identifier
    fn kind(&self) -> StrategyKind;

    /// Block the worker thread observing the clipboard.
    ///
    /// Returns `Ok(())` once the session is stopped. An error means the
    /// strategy broke down and the next one should be tried.
    fn run(self: Box<Self>, delivery: Delivery) -> Result<()>;
}

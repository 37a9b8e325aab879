//! Polling Strategy
//!
//! Fallback for sessions without an event source: list the advertised MIME
//! types with `xclip` or `wl-paste`, classify them, and fetch the payload
//! when the kind is enabled. Runs until the session stops, sleeping on the
//! session's shutdown channel between polls so stop is observed at once.

mod runner;
mod tool;

pub use runner::{CommandRunner, SystemCommandRunner};
pub use tool::{ClipboardTool, ToolPreference};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use super::{Availability, ClipboardStrategy, StrategyKind, StrategyProbe};
use crate::clipboard::mime::{parse_mime_list, TEXT_MIME_PREFERENCE};
use crate::clipboard::{classify, receive_value, ContentSource, Result};
use crate::session::{Delivery, DeliveryOutcome, MonitorOptions};

/// Polling configuration resolved from [`crate::config::PollingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingSettings {
    /// Which tool to use
    pub tool: ToolPreference,
    /// Poll interval when using `xclip`
    pub xclip_interval: Duration,
    /// Poll interval when using `wl-paste`
    pub wl_paste_interval: Duration,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            tool: ToolPreference::Auto,
            xclip_interval: ClipboardTool::Xclip.default_interval(),
            wl_paste_interval: ClipboardTool::WlPaste.default_interval(),
        }
    }
}

impl PollingSettings {
    /// Interval for the chosen tool
    pub fn interval_for(&self, tool: ClipboardTool) -> Duration {
        match tool {
            ClipboardTool::Xclip => self.xclip_interval,
            ClipboardTool::WlPaste => self.wl_paste_interval,
        }
    }
}

/// Probe for the polling strategy
///
/// Always available; the probe only decides which tool to poll with.
pub struct PollingProbe {
    settings: PollingSettings,
    runner: Arc<dyn CommandRunner>,
}

impl PollingProbe {
    /// Probe running real commands
    pub fn new(settings: PollingSettings) -> Self {
        Self::with_runner(settings, Arc::new(SystemCommandRunner))
    }

    /// Probe with a custom command runner
    pub fn with_runner(settings: PollingSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self { settings, runner }
    }
}

impl StrategyProbe for PollingProbe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Polling
    }

    fn probe(&self, _options: &MonitorOptions) -> Availability {
        let tool = self.settings.tool.resolve(self.runner.as_ref());
        let interval = self.settings.interval_for(tool);
        Availability::Ready(Box::new(PollingStrategy::new(
            tool,
            interval,
            self.runner.clone(),
        )))
    }
}

/// Timed CLI polling loop
pub struct PollingStrategy {
    tool: ClipboardTool,
    interval: Duration,
    runner: Arc<dyn CommandRunner>,
}

impl PollingStrategy {
    /// Create a polling loop for `tool`
    pub fn new(tool: ClipboardTool, interval: Duration, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            tool,
            interval,
            runner,
        }
    }

    /// Tool this loop polls with
    pub fn tool(&self) -> ClipboardTool {
        self.tool
    }

    /// Run one poll cycle.
    ///
    /// Returns the delivery outcome when a value was read.
    pub fn poll_once(&self, delivery: &mut Delivery) -> Option<DeliveryOutcome> {
        let program = self.tool.program();
        let raw = match self.runner.run(program, &self.tool.list_args()) {
            Ok(raw) => raw,
            Err(e) => {
                delivery.report_error("Failed to retrieve MIME types", &e);
                return None;
            }
        };

        let mime_types = parse_mime_list(&raw);
        let kind = classify(&mime_types);
        if !delivery.options().accepts(kind) {
            trace!("Ignoring {} clipboard ({} MIME types)", kind, mime_types.len());
            return None;
        }

        let mut source = CommandSource::new(self.tool, self.runner.as_ref());
        match receive_value(&mut source, kind, &mime_types) {
            Ok(Some(value)) => Some(delivery.deliver(value)),
            Ok(None) => {
                trace!("No {} content read", kind);
                None
            }
            Err(e) => {
                delivery.report_error(&format!("Failed to retrieve {kind} content"), &e);
                None
            }
        }
    }
}

impl ClipboardStrategy for PollingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Polling
    }

    fn run(self: Box<Self>, mut delivery: Delivery) -> Result<()> {
        info!(
            "Polling clipboard with {} every {}ms",
            self.tool,
            self.interval.as_millis()
        );

        while delivery.is_running() {
            self.poll_once(&mut delivery);
            if !delivery.sleep(self.interval) {
                break;
            }
        }

        debug!("Polling loop stopped");
        Ok(())
    }
}

/// Reads one selection through the CLI tool.
///
/// Text is fetched with the tool's plain text mode once per cycle; other
/// representations are requested by MIME type.
struct CommandSource<'a> {
    tool: ClipboardTool,
    runner: &'a dyn CommandRunner,
    text_fetched: bool,
}

impl<'a> CommandSource<'a> {
    fn new(tool: ClipboardTool, runner: &'a dyn CommandRunner) -> Self {
        Self {
            tool,
            runner,
            text_fetched: false,
        }
    }
}

impl ContentSource for CommandSource<'_> {
    fn receive(&mut self, mime_type: &str) -> Result<Option<Vec<u8>>> {
        let program = self.tool.program();
        if TEXT_MIME_PREFERENCE.contains(&mime_type) {
            if self.text_fetched {
                return Ok(None);
            }
            self.text_fetched = true;
            return self.runner.run(program, &self.tool.text_args()).map(Some);
        }
        self.runner.run(program, &self.tool.typed_args(mime_type)).map(Some)
    }
}

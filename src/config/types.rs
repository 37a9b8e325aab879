//! Configuration section types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::strategies::data_control::DEFAULT_DISPATCH_TIMEOUT;
use crate::strategies::polling::{ClipboardTool, PollingSettings, ToolPreference};

/// Data-control strategy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataControlConfig {
    /// Longest wait for protocol events before re-checking for stop (ms)
    pub dispatch_timeout_ms: u64,
}

impl Default for DataControlConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: DEFAULT_DISPATCH_TIMEOUT.as_millis() as u64,
        }
    }
}

impl DataControlConfig {
    /// Dispatch timeout as a duration
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

/// Polling strategy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Tool selection ("auto", "xclip", "wl-paste")
    pub tool: ToolPreference,

    /// Poll interval with xclip (ms)
    pub xclip_interval_ms: u64,

    /// Poll interval with wl-paste (ms)
    pub wl_paste_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tool: ToolPreference::Auto,
            xclip_interval_ms: ClipboardTool::Xclip.default_interval().as_millis() as u64,
            wl_paste_interval_ms: ClipboardTool::WlPaste.default_interval().as_millis() as u64,
        }
    }
}

impl PollingConfig {
    /// Settings handed to the polling probe
    pub fn settings(&self) -> PollingSettings {
        PollingSettings {
            tool: self.tool,
            xclip_interval: Duration::from_millis(self.xclip_interval_ms),
            wl_paste_interval: Duration::from_millis(self.wl_paste_interval_ms),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

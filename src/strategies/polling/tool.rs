//! Clipboard CLI tools
//!
//! Argument vectors for the two supported tools. `xclip` talks to the X11
//! selection, `wl-paste` (wl-clipboard) to the Wayland one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

use super::runner::CommandRunner;
use crate::clipboard::mime::URI_LIST_MIME;

/// External clipboard reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    /// `xclip -selection clipboard`
    Xclip,
    /// `wl-paste`
    WlPaste,
}

impl ClipboardTool {
    /// Executable name
    pub fn program(&self) -> &'static str {
        match self {
            ClipboardTool::Xclip => "xclip",
            ClipboardTool::WlPaste => "wl-paste",
        }
    }

    /// Arguments listing the advertised MIME types
    pub fn list_args(&self) -> Vec<&'static str> {
        match self {
            ClipboardTool::Xclip => vec!["-selection", "clipboard", "-t", "TARGETS", "-o"],
            ClipboardTool::WlPaste => vec!["-l"],
        }
    }

    /// Arguments fetching the selection as text
    pub fn text_args(&self) -> Vec<&'static str> {
        match self {
            ClipboardTool::Xclip => vec!["-selection", "clipboard", "-o"],
            ClipboardTool::WlPaste => vec!["-n"],
        }
    }

    /// Arguments fetching the selection as `mime_type`
    pub fn typed_args<'a>(&self, mime_type: &'a str) -> Vec<&'a str> {
        match self {
            ClipboardTool::Xclip => vec!["-selection", "clipboard", "-t", mime_type, "-o"],
            ClipboardTool::WlPaste if mime_type == URI_LIST_MIME => vec!["-t", mime_type, "-n"],
            ClipboardTool::WlPaste => vec!["-t", mime_type],
        }
    }

    /// Default poll interval.
    ///
    /// X11 selection queries are cheap, so `xclip` polls faster.
    pub fn default_interval(&self) -> Duration {
        match self {
            ClipboardTool::Xclip => Duration::from_millis(300),
            ClipboardTool::WlPaste => Duration::from_millis(1000),
        }
    }

    /// Pick a tool by asking `xclip` for the clipboard targets.
    ///
    /// If `xclip` answers, the X11 clipboard is reachable and owned;
    /// otherwise `wl-paste` is used.
    pub fn detect(runner: &dyn CommandRunner) -> ClipboardTool {
        let xclip = ClipboardTool::Xclip;
        match runner.run(xclip.program(), &xclip.list_args()) {
            Ok(_) => {
                info!("X11 clipboard reachable, polling with xclip");
                ClipboardTool::Xclip
            }
            Err(e) => {
                warn!("xclip does not own the clipboard ({}), switching to wl-paste", e);
                ClipboardTool::WlPaste
            }
        }
    }
}

impl fmt::Display for ClipboardTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Tool selection for the polling strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolPreference {
    /// Detect at startup
    #[default]
    Auto,
    /// Always use `xclip`
    Xclip,
    /// Always use `wl-paste`
    WlPaste,
}

impl ToolPreference {
    /// Resolve to a concrete tool, running detection for `Auto`
    pub fn resolve(&self, runner: &dyn CommandRunner) -> ClipboardTool {
        match self {
            ToolPreference::Auto => ClipboardTool::detect(runner),
            ToolPreference::Xclip => ClipboardTool::Xclip,
            ToolPreference::WlPaste => ClipboardTool::WlPaste,
        }
    }
}

//! Monitor Error Types
//!
//! Error handling shared by every monitoring strategy and the dispatcher.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::RegexSet;
use thiserror::Error;

use crate::strategies::StrategyKind;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Strategy cannot run in this session
    #[error("{strategy} strategy unavailable: {reason}")]
    Unavailable {
        /// Strategy that was probed
        strategy: StrategyKind,
        /// Why the probe failed
        reason: String,
    },

    /// External clipboard command exited unsuccessfully
    #[error("{program} failed: {stderr}")]
    CommandFailed {
        /// Program name
        program: String,
        /// Trimmed standard error output
        stderr: String,
    },

    /// External clipboard command could not be started
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Text payload was not valid UTF-8
    #[error("Invalid UTF-8 data for {mime_type}")]
    InvalidUtf8 {
        /// MIME type that was read
        mime_type: String,
    },

    /// Wayland protocol failure
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Toolkit clipboard failure
    #[error("Toolkit error: {0}")]
    Toolkit(String),

    /// Worker did not finish within the stop timeout
    #[error("Monitor worker did not stop within {0}ms")]
    JoinTimeout(u64),

    /// Worker thread panicked
    #[error("Monitor worker panicked")]
    WorkerPanicked,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classification for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Strategy cannot be used, fall back to the next one
    Unavailable,
    /// Single read or command failed, the strategy may be restarted
    TransientIo,
    /// Protocol connection is broken
    ProtocolFault,
    /// Worker lifecycle problem
    Lifecycle,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorType::Unavailable => write!(f, "unavailable"),
            ErrorType::TransientIo => write!(f, "transient-io"),
            ErrorType::ProtocolFault => write!(f, "protocol-fault"),
            ErrorType::Lifecycle => write!(f, "lifecycle"),
        }
    }
}

/// Classify error for recovery strategy selection
pub fn classify_error(error: &MonitorError) -> ErrorType {
    match error {
        MonitorError::Unavailable { .. } | MonitorError::Spawn { .. } => ErrorType::Unavailable,

        MonitorError::CommandFailed { .. }
        | MonitorError::InvalidUtf8 { .. }
        | MonitorError::Toolkit(_)
        | MonitorError::Io(_) => ErrorType::TransientIo,

        MonitorError::Protocol(_) => ErrorType::ProtocolFault,

        MonitorError::JoinTimeout(_) | MonitorError::WorkerPanicked => ErrorType::Lifecycle,
    }
}

impl MonitorError {
    /// Whether the same strategy may be tried again after this error
    pub fn is_recoverable(&self) -> bool {
        classify_error(self) == ErrorType::TransientIo
    }

    /// Whether this error only means "the clipboard is empty"
    pub fn is_benign(&self) -> bool {
        is_benign_message(&self.to_string())
    }
}

/// Consecutive restarts of a strategy after transient failures
pub const MAX_STRATEGY_RETRIES: u32 = 3;

/// Base delay before restarting a strategy
pub const STRATEGY_RETRY_DELAY: Duration = Duration::from_millis(100);

/// What the selector does after a strategy run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Probe and run the same strategy again after `delay`
    Retry {
        /// Wait before the next attempt
        delay: Duration,
    },
    /// Move on to the next strategy
    FallBack,
}

/// Determine recovery action for a failed strategy run.
///
/// `attempt` counts the retries already made for this strategy.
pub fn recovery_action(error: &MonitorError, attempt: u32) -> RecoveryAction {
    if error.is_recoverable() && attempt < MAX_STRATEGY_RETRIES {
        RecoveryAction::Retry {
            delay: STRATEGY_RETRY_DELAY * (attempt + 1),
        }
    } else {
        RecoveryAction::FallBack
    }
}

/// Messages clipboard tools print when there is nothing to read
const BENIGN_PATTERNS: [&str; 3] = [
    r"target .+ not available",
    r"no suitable type of content copied",
    r"nothing is copied",
];

fn benign_patterns() -> &'static RegexSet {
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RegexSet::new(BENIGN_PATTERNS.iter().map(|p| format!("(?i){p}")))
            .unwrap_or_else(|_| RegexSet::empty())
    })
}

/// Check whether a tool error message indicates an empty clipboard.
///
/// Matching is case-insensitive.
pub fn is_benign_message(message: &str) -> bool {
    benign_patterns().is_match(message)
}

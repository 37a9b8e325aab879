//! Configuration management
//!
//! Handles loading and validation of configuration from:
//! - TOML files
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::strategies::StrategyKind;

pub mod types;

pub use types::{DataControlConfig, LoggingConfig, PollingConfig};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Report image changes
    pub enable_image: bool,
    /// Report file list changes
    pub enable_files: bool,
    /// Strategies to try, in order
    pub strategies: Vec<StrategyKind>,
    /// Bounded join used by stop (ms)
    pub stop_timeout_ms: u64,
    /// Data-control configuration
    pub data_control: DataControlConfig,
    /// Polling configuration
    pub polling: PollingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enable_image: false,
            enable_files: false,
            strategies: StrategyKind::ALL.to_vec(),
            stop_timeout_ms: 5000,
            data_control: DataControlConfig::default(),
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: MonitorConfig =
            toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            anyhow::bail!("At least one strategy must be configured");
        }
        for (i, kind) in self.strategies.iter().enumerate() {
            if self.strategies[..i].contains(kind) {
                anyhow::bail!("Strategy listed twice: {}", kind);
            }
        }

        if self.stop_timeout_ms == 0 {
            anyhow::bail!("stop_timeout_ms must be greater than zero");
        }
        if self.data_control.dispatch_timeout_ms == 0 {
            anyhow::bail!("data_control.dispatch_timeout_ms must be greater than zero");
        }
        if self.polling.xclip_interval_ms == 0 {
            anyhow::bail!("polling.xclip_interval_ms must be greater than zero");
        }
        if self.polling.wl_paste_interval_ms == 0 {
            anyhow::bail!("polling.wl_paste_interval_ms must be greater than zero");
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        enable_image: bool,
        enable_files: bool,
        strategy: Option<StrategyKind>,
    ) -> Self {
        self.enable_image |= enable_image;
        self.enable_files |= enable_files;
        if let Some(kind) = strategy {
            self.strategies = vec![kind];
        }
        self
    }

    /// Stop timeout as a duration
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::polling::ToolPreference;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert!(!config.enable_image);
        assert!(!config.enable_files);
        assert_eq!(
            config.strategies,
            vec![
                StrategyKind::DataControl,
                StrategyKind::Toolkit,
                StrategyKind::Polling
            ]
        );
        assert_eq!(config.stop_timeout(), Duration::from_secs(5));
        assert_eq!(config.data_control.dispatch_timeout_ms, 250);
        assert_eq!(config.polling.xclip_interval_ms, 300);
        assert_eq!(config.polling.wl_paste_interval_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
enable_image = true
strategies = ["polling"]

[polling]
tool = "wl-paste"
wl_paste_interval_ms = 500
"#
        )
        .unwrap();

        let config = MonitorConfig::load(file.path()).unwrap();
        assert!(config.enable_image);
        assert!(!config.enable_files);
        assert_eq!(config.strategies, vec![StrategyKind::Polling]);
        assert_eq!(config.polling.tool, ToolPreference::WlPaste);
        assert_eq!(config.polling.wl_paste_interval_ms, 500);
        assert_eq!(config.polling.xclip_interval_ms, 300);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MonitorConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_rejects_unknown_strategy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"strategies = ["portal"]"#).unwrap();
        assert!(MonitorConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_config_validation_empty_strategies() {
        let config = MonitorConfig {
            strategies: Vec::new(),
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duplicate_strategy() {
        let config = MonitorConfig {
            strategies: vec![StrategyKind::Polling, StrategyKind::Polling],
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_values() {
        let mut config = MonitorConfig::default();
        config.stop_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.polling.xclip_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = MonitorConfig::default();
        config.data_control.dispatch_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = MonitorConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = MonitorConfig::default().with_overrides(true, false, Some(StrategyKind::Toolkit));
        assert!(config.enable_image);
        assert!(!config.enable_files);
        assert_eq!(config.strategies, vec![StrategyKind::Toolkit]);

        let config = MonitorConfig::default().with_overrides(false, false, None);
        assert_eq!(config.strategies.len(), 3);
    }
}

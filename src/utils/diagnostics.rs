//! Startup Diagnostics
//!
//! Logs the host and display session the monitor runs in, so a report of
//! "no updates" can be matched to the strategy that was (or was not) usable.

use std::env;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::{info, warn};

/// Host information
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system name
    pub os_name: String,
    /// Operating system version
    pub os_version: String,
    /// Kernel version
    pub kernel_version: String,
    /// Logical CPUs
    pub cpu_count: usize,
}

impl SystemInfo {
    /// Gather host information
    pub fn gather() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();

        Self {
            os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
            cpu_count: sys.cpus().len(),
        }
    }

    /// Log host information
    pub fn log(&self) {
        info!("=== System Information ===");
        info!("  OS: {} {}", self.os_name, self.os_version);
        info!("  Kernel: {}", self.kernel_version);
        info!("  CPUs: {}", self.cpu_count);
    }
}

/// Display session variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayEnvironment {
    /// `XDG_SESSION_TYPE`
    pub session_type: Option<String>,
    /// `WAYLAND_DISPLAY`
    pub wayland_display: Option<String>,
    /// `DISPLAY`
    pub x11_display: Option<String>,
    /// `XDG_CURRENT_DESKTOP`
    pub desktop: Option<String>,
}

impl DisplayEnvironment {
    /// Read from the process environment
    pub fn detect() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            session_type: get("XDG_SESSION_TYPE"),
            wayland_display: get("WAYLAND_DISPLAY"),
            x11_display: get("DISPLAY"),
            desktop: get("XDG_CURRENT_DESKTOP"),
        }
    }

    /// Whether a Wayland compositor should be reachable
    pub fn is_wayland(&self) -> bool {
        self.wayland_display.is_some()
            || self
                .session_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("wayland"))
    }

    /// Whether an X server should be reachable (Xwayland included)
    pub fn has_x11(&self) -> bool {
        self.x11_display.is_some()
    }

    /// Polling tools that can reach this session's clipboard
    pub fn polling_tools(&self) -> Vec<&'static str> {
        let mut tools = Vec::new();
        if self.is_wayland() {
            tools.push("wl-paste");
        }
        if self.has_x11() {
            tools.push("xclip");
        }
        tools
    }

    /// Log the display session
    pub fn log(&self) {
        let unset = "(unset)";
        info!("=== Display Session ===");
        info!(
            "  Session type: {}",
            self.session_type.as_deref().unwrap_or(unset)
        );
        info!(
            "  Desktop: {}",
            self.desktop.as_deref().unwrap_or(unset)
        );
        info!(
            "  WAYLAND_DISPLAY: {}",
            self.wayland_display.as_deref().unwrap_or(unset)
        );
        info!(
            "  DISPLAY: {}",
            self.x11_display.as_deref().unwrap_or(unset)
        );
    }
}

/// Locate `program` on `PATH`
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Log startup diagnostics
pub fn log_startup_diagnostics() {
    info!("=== Clipboard Monitor Startup ===");
    info!("  Version: {}", env!("CARGO_PKG_VERSION"));

    SystemInfo::gather().log();

    let display = DisplayEnvironment::detect();
    display.log();

    let usable = display.polling_tools();
    if usable.is_empty() {
        warn!("Neither WAYLAND_DISPLAY nor DISPLAY is set, no clipboard will be reachable");
    }

    info!("=== Polling Tools ===");
    for program in ["xclip", "wl-paste"] {
        let scope = if usable.contains(&program) {
            ""
        } else {
            " (not usable in this session)"
        };
        match find_in_path(program) {
            Some(path) => info!("  {}: {}{}", program, path.display(), scope),
            None => info!("  {}: not found in PATH{}", program, scope),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_system_info_gather() {
        let info = SystemInfo::gather();
        assert!(!info.os_name.is_empty());
        assert!(info.cpu_count > 0);
    }

    #[test]
    fn test_wayland_session() {
        let env = DisplayEnvironment::from_lookup(lookup(&[
            ("XDG_SESSION_TYPE", "wayland"),
            ("WAYLAND_DISPLAY", "wayland-0"),
            ("DISPLAY", ":0"),
        ]));
        assert!(env.is_wayland());
        assert!(env.has_x11());
        assert_eq!(env.desktop, None);
    }

    #[test]
    fn test_x11_session() {
        let env = DisplayEnvironment::from_lookup(lookup(&[
            ("XDG_SESSION_TYPE", "x11"),
            ("DISPLAY", ":1"),
            ("WAYLAND_DISPLAY", ""),
        ]));
        assert!(!env.is_wayland());
        assert!(env.has_x11());
        assert_eq!(env.wayland_display, None);
    }

    #[test]
    fn test_polling_tools_follow_session() {
        let wayland = DisplayEnvironment::from_lookup(lookup(&[
            ("WAYLAND_DISPLAY", "wayland-0"),
            ("DISPLAY", ":0"),
        ]));
        assert_eq!(wayland.polling_tools(), vec!["wl-paste", "xclip"]);

        let x11 = DisplayEnvironment::from_lookup(lookup(&[("DISPLAY", ":1")]));
        assert_eq!(x11.polling_tools(), vec!["xclip"]);

        let headless = DisplayEnvironment::from_lookup(lookup(&[]));
        assert!(headless.polling_tools().is_empty());
    }

    #[test]
    fn test_find_in_path() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("definitely-not-a-real-program-xyz").is_none());
    }
}

//! External command execution

use std::process::{Command, Stdio};
use tracing::trace;

use crate::clipboard::{MonitorError, Result};

/// Runs a clipboard CLI and returns its standard output
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`.
    ///
    /// Exit status 0 yields stdout. A non-zero exit yields
    /// [`MonitorError::CommandFailed`] carrying stderr.
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>>;
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        trace!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| MonitorError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(MonitorError::CommandFailed {
                program: program.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

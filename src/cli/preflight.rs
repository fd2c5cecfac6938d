//! Pre-flight checks before a run.
//!
//! Validates that the external tools the video host relies on are available
//! before any source is processed.

use crate::error::{Result, SynocastError};
use std::process::Command;

/// Check if an external tool is available and return its version line.
pub fn check_tool(name: &str) -> Result<String> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("installed")
            .trim()
            .to_string()),
        Ok(_) => Err(SynocastError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SynocastError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SynocastError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

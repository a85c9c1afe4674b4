//! External tool detection.
//!
//! Checks that the programs a pipeline is about to spawn are on `PATH`, so a
//! missing toolchain fails before any directory is touched.

use crate::error::{BundlerError, Result};
use std::path::PathBuf;

/// Resolves `tool` on `PATH`.
pub fn require_tool(tool: &str) -> Result<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());
            Ok(path)
        }
        Err(e) => {
            log::warn!("{} not found in PATH: {}", tool, e);
            Err(BundlerError::ToolNotFound {
                tool: tool.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

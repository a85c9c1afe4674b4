//! Castboard bundle builder and update packager
//!
//! This library provides the pipelines behind the `castboard_bundler` CLI:
//! - Cross-compiled eLinux release builds
//! - Update archives from Yocto build artifacts
//! - Packaging any bundle directory as `<codename>.zip`
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};

//! Error types for bundling operations.
//!
//! Every pipeline step returns [`Result`], and the first error aborts the run.
//! [`BundlerError::exit_code`] maps an error onto the process exit status so a
//! failing external tool's own exit code reaches the operator.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for bundler operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for all bundler operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// An external command ran but exited unsuccessfully
    #[error("Shell command failed: `{command}` ({}){}", exit_label(.code), stderr_suffix(.stderr))]
    CommandFailed {
        /// Full command line that failed
        command: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard error output
        stderr: String,
    },

    /// An external command could not be started
    #[error("Failed to execute `{command}`: {source}")]
    SpawnFailed {
        /// Command that could not be spawned
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A required external tool is not on PATH
    #[error("Required tool `{tool}` not found in PATH: {reason}")]
    ToolNotFound {
        /// Tool name
        tool: String,
        /// Why lookup failed
        reason: String,
    },

    /// The codename file of a bundle is missing
    #[error("Codename file not found: {}", .path.display())]
    CodenameNotFound {
        /// Expected location of the codename file
        path: PathBuf,
    },

    /// The codename cannot be used as an archive name
    #[error("Invalid codename {codename:?}: {reason}")]
    InvalidCodename {
        /// Offending value
        codename: String,
        /// Why it was rejected
        reason: String,
    },

    /// A step returned success but its expected result is not on disk
    #[error("Step `{step}` did not complete: {reason}")]
    StepVerification {
        /// Step description
        step: String,
        /// Failed postcondition
        reason: String,
    },

    /// Filesystem error with the operation and path that caused it
    #[error("{context} ({}): {source}", .path.display())]
    Fs {
        /// What was being done
        context: String,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive errors
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal errors
    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path prefix errors
    #[error("Path error: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Glob pattern errors
    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic error with message
    #[error("{0}")]
    GenericError(String),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}

impl BundlerError {
    /// Process exit code for this error.
    ///
    /// A failing external command propagates its own non-zero code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Attach a filesystem context to IO results.
pub trait ErrorExt<T> {
    /// Wrap an IO error with the operation and path it happened on.
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| BundlerError::Fs {
            context: context.to_string(),
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Convert an empty or failed value into a [`BundlerError::GenericError`].
pub trait Context<T> {
    /// Attach a message used when the value is missing.
    fn context<C: std::fmt::Display>(self, msg: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, msg: C) -> Result<T> {
        self.ok_or_else(|| BundlerError::GenericError(msg.to_string()))
    }
}

impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
    fn context<C: std::fmt::Display>(self, msg: C) -> Result<T> {
        self.map_err(|e| BundlerError::GenericError(format!("{msg}: {e}")))
    }
}

/// Return early with a [`BundlerError::GenericError`].
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::error::BundlerError::GenericError(format!($($arg)*)))
    };
}

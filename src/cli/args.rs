//! Command line argument parsing and validation.
//!
//! This module provides CLI argument parsing using clap, with validation
//! and the runtime configuration derived from it.

use crate::bundler::codename::validate_codename;
use crate::bundler::settings::DEFAULT_APP_NAME;
use crate::error::{CliError, ErrorExt, Result};
use crate::runner::{AnyExecutor, NativeExecutor, ShellExecutor, StepRunner};
use clap::{Parser, Subcommand};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Castboard bundle builder and update packager
#[derive(Parser, Debug)]
#[command(
    name = "castboard_bundler",
    version,
    about = "Builds Castboard eLinux bundles and packages them as update archives",
    long_about = "Builds Castboard eLinux bundles and packages them as <codename>.zip update archives.

Usage:
  castboard_bundler import-yocto . core-image.tar build/updates
  castboard_bundler import-yocto . deploy.tar /rootfs build/updates
  castboard_bundler build-release ~/castboard/player
  castboard_bundler package build/elinux/arm64/release/bundle dist

Exit code 0 = update archive guaranteed to exist in the output directory."
)]
pub struct Args {
    /// Run every step through external Unix tools (sh, rm, mkdir, mv, zip, tar)
    #[arg(long, global = true)]
    pub shell_tools: bool,

    /// Fixed pause after every step, in milliseconds
    #[arg(
        long,
        global = true,
        value_name = "MS",
        env = "CASTBOARD_SETTLE_DELAY_MS",
        default_value_t = 0
    )]
    pub settle_delay_ms: u64,

    /// Scratch directory for Yocto artifact extraction
    ///
    /// Deleted and recreated on every import.
    #[arg(long, global = true, value_name = "PATH", env = "CASTBOARD_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Bundler subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Package the player bundle found in a Yocto tar artifact
    ImportYocto(ImportYoctoArgs),
    /// Cross-compile, stamp and package a release bundle
    BuildRelease(BuildReleaseArgs),
    /// Package an existing bundle directory
    Package(PackageArgs),
    /// Write a codename file into a bundle directory
    StampCodename(StampCodenameArgs),
}

/// Arguments of `import-yocto`
#[derive(clap::Args, Debug)]
pub struct ImportYoctoArgs {
    /// Project root, used as working directory
    #[arg(value_name = "PROJECT_ROOT")]
    pub project_root: PathBuf,

    /// Tar artifact produced by the Yocto build
    #[arg(value_name = "ARTIFACT")]
    pub artifact: PathBuf,

    /// `[ROOTFS_PATH] OUTPUT_DIR`
    ///
    /// With two values the first is the rootfs location inside the
    /// artifact and the second the output directory.
    #[arg(value_name = "PATHS", num_args = 1..=2, required = true)]
    pub paths: Vec<PathBuf>,

    /// Application directory name under usr/share in the rootfs
    #[arg(long, value_name = "NAME", default_value = DEFAULT_APP_NAME)]
    pub app_name: String,
}

impl ImportYoctoArgs {
    /// Splits the trailing positionals into rootfs path and output directory.
    pub fn rootfs_and_output(&self) -> Result<(Option<&Path>, &Path)> {
        match self.paths.as_slice() {
            [output] => Ok((None, output.as_path())),
            [rootfs, output] => Ok((Some(rootfs.as_path()), output.as_path())),
            _ => Err(CliError::MissingArgument {
                argument: "OUTPUT_DIR".to_string(),
            }
            .into()),
        }
    }
}

/// Arguments of `build-release`
#[derive(clap::Args, Debug)]
pub struct BuildReleaseArgs {
    /// Flutter project root
    #[arg(value_name = "PROJECT_ROOT", default_value = ".")]
    pub project_root: PathBuf,

    /// Codename to stamp instead of the one in the project sources
    #[arg(long)]
    pub codename: Option<String>,

    /// Directory receiving the update archive
    #[arg(long, value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Release configuration file (default: <PROJECT_ROOT>/castboard_build.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments of `package`
#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Bundle directory to archive
    #[arg(value_name = "BUNDLE_DIR")]
    pub bundle_dir: PathBuf,

    /// Directory receiving the update archive
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Archive codename (default: contents of <BUNDLE_DIR>/codename)
    #[arg(long)]
    pub codename: Option<String>,
}

/// Arguments of `stamp-codename`
#[derive(clap::Args, Debug)]
pub struct StampCodenameArgs {
    /// Bundle directory to stamp
    #[arg(value_name = "BUNDLE_DIR")]
    pub bundle_dir: PathBuf,

    /// Codename to write
    #[arg(value_name = "CODENAME")]
    pub codename: String,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        let codename = match &self.command {
            Command::ImportYocto(import) => {
                if import.app_name.is_empty() || import.app_name.contains('/') {
                    return Err(format!("Invalid app name: {:?}", import.app_name));
                }
                None
            }
            Command::BuildRelease(release) => release.codename.as_deref(),
            Command::Package(package) => package.codename.as_deref(),
            Command::StampCodename(stamp) => Some(stamp.codename.as_str()),
        };

        if let Some(codename) = codename {
            validate_codename(codename).map_err(|e| e.to_string())?;
        }

        if matches!(&self.work_dir, Some(dir) if dir.as_os_str().is_empty()) {
            return Err("Work directory cannot be empty".to_string());
        }

        Ok(())
    }
}

/// Resolves `path` against the current directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    path.absolutize()
        .map(|p| p.into_owned())
        .fs_context("resolving path", path)
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    runner: StepRunner<AnyExecutor>,
    shell_tools: bool,
    work_dir: Option<PathBuf>,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        let executor = if args.shell_tools {
            AnyExecutor::Shell(ShellExecutor::new())
        } else {
            AnyExecutor::Native(NativeExecutor::new())
        };
        let runner = StepRunner::new(executor)
            .with_settle_delay(Duration::from_millis(args.settle_delay_ms));

        Self {
            runner,
            shell_tools: args.shell_tools,
            work_dir: args.work_dir.clone(),
        }
    }
}

impl RuntimeConfig {
    /// Step runner shared by every pipeline of this invocation
    pub fn runner(&self) -> &StepRunner<AnyExecutor> {
        &self.runner
    }

    /// Whether steps run through external tools
    pub fn shell_tools(&self) -> bool {
        self.shell_tools
    }

    /// Work directory override for Yocto imports
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }
}

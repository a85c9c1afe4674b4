//! `package` subcommand.

use crate::bundler::codename::CODENAME_FILE;
use crate::bundler::{UpdateArchive, package_bundle_as_update, read_codename_file};
use crate::cli::args::{PackageArgs, absolute};
use crate::cli::RuntimeConfig;
use crate::error::{ErrorExt, Result};

/// Packages an existing bundle directory.
pub async fn package(args: &PackageArgs, config: &RuntimeConfig) -> Result<UpdateArchive> {
    let bundle_dir = absolute(&args.bundle_dir)?;
    let output_dir = absolute(&args.output_dir)?;

    let codename = match &args.codename {
        Some(codename) => codename.clone(),
        None => read_codename_file(&bundle_dir.join(CODENAME_FILE)).await?,
    };

    let cwd = std::env::current_dir().fs_context("reading current directory", ".")?;
    package_bundle_as_update(config.runner(), &cwd, &bundle_dir, &output_dir, &codename).await
}

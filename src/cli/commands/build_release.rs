//! `build-release` subcommand.

use crate::bundler::{ReleaseBuilder, ReleaseSettings, UpdateArchive};
use crate::cli::args::{BuildReleaseArgs, absolute};
use crate::cli::RuntimeConfig;
use crate::error::Result;

/// Cross-compiles the project, stamps the codename and packages the bundle.
pub async fn build_release(
    args: &BuildReleaseArgs,
    config: &RuntimeConfig,
) -> Result<UpdateArchive> {
    let project_root = absolute(&args.project_root)?;
    let config_file = args.config.as_deref().map(absolute).transpose()?;
    let output_dir = args.output_dir.as_deref().map(absolute).transpose()?;

    let settings = ReleaseSettings::load(&project_root, config_file.as_deref())?;
    let builder = ReleaseBuilder::new(config.runner(), &project_root, settings);
    let tool = builder.preflight()?;
    log::info!(
        "Using {} at {} for {}",
        builder.settings().build_tool,
        tool.display(),
        builder.settings().target_arch
    );

    builder
        .release(args.codename.as_deref(), output_dir.as_deref())
        .await
}

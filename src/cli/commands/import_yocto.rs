//! `import-yocto` subcommand.

use crate::bundler::{ImportSettings, UpdateArchive, YoctoImport, import_yocto_artifact};
use crate::cli::args::{ImportYoctoArgs, absolute};
use crate::cli::RuntimeConfig;
use crate::error::{CliError, Result};
use std::path::Path;

/// Packages the bundle inside a Yocto tar artifact.
pub async fn import_yocto(args: &ImportYoctoArgs, config: &RuntimeConfig) -> Result<UpdateArchive> {
    let (rootfs_path, output_dir) = args.rootfs_and_output()?;

    let project_root = absolute(&args.project_root)?;
    if !project_root.is_dir() {
        return Err(CliError::InvalidArguments {
            reason: format!("Project root is not a directory: {}", project_root.display()),
        }
        .into());
    }

    let mut settings = ImportSettings::new().app_name(&args.app_name);
    if let Some(work_dir) = config.work_dir() {
        settings = settings.work_dir(absolute(work_dir)?);
    }

    let import = YoctoImport {
        project_root,
        artifact: absolute(&args.artifact)?,
        rootfs_path: rootfs_path.map(Path::to_path_buf),
        output_dir: absolute(output_dir)?,
    };

    import_yocto_artifact(config.runner(), &settings, &import).await
}

//! Packaging a bundle directory as an update archive.
//!
//! Generated archive layout mirrors the bundle:
//!
//! ```text
//! lib/
//! data/
//! performer
//! codename
//! ```

use super::checksum::calculate_sha256;
use super::codename::validate_codename;
use crate::error::{BundlerError, ErrorExt, Result};
use crate::runner::{CommandExecutor, Step, StepRunner};
use std::path::{Path, PathBuf};

/// A packaged update archive in its final location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateArchive {
    /// Codename the archive is named after
    pub codename: String,
    /// `<output_dir>/<codename>.zip`
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex-encoded SHA-256 of the archive
    pub checksum: String,
}

/// File name of the update archive for `codename`.
pub fn archive_file_name(codename: &str) -> String {
    format!("{codename}.zip")
}

/// Steps that turn `bundle_dir` into `<output_dir>/<codename>.zip`.
///
/// 1. Remove stray `*.zip` files from the bundle directory
/// 2. Zip the bundle contents into the bundle directory
/// 3. Create the output directory
/// 4. Delete a previous archive with the same name from the output directory
/// 5. Move the new archive into the output directory
///
/// When the output directory is the bundle directory the archive is already
/// in place after step 2 and the remaining steps are left out.
pub fn packaging_steps(bundle_dir: &Path, output_dir: &Path, codename: &str) -> Vec<Step> {
    let file_name = archive_file_name(codename);
    let staged = bundle_dir.join(&file_name);
    let published = output_dir.join(&file_name);

    let mut steps = vec![
        Step::RemoveMatching {
            dir: bundle_dir.to_path_buf(),
            extension: "zip".to_string(),
        },
        Step::Zip {
            source_dir: bundle_dir.to_path_buf(),
            archive: staged.clone(),
        },
    ];
    if staged == published {
        return steps;
    }

    steps.extend([
        Step::CreateDir(output_dir.to_path_buf()),
        Step::RemoveFile(published.clone()),
        Step::Move {
            from: staged,
            to: published,
        },
    ]);
    steps
}

/// Packages `bundle_dir` as `<output_dir>/<codename>.zip`.
///
/// Any archive with the same name already in `output_dir` is replaced.
/// The bundle directory is modified transiently: stray archives are removed
/// and the new archive is staged there before the move.
pub async fn package_bundle_as_update<E: CommandExecutor>(
    runner: &StepRunner<E>,
    project_root: &Path,
    bundle_dir: &Path,
    output_dir: &Path,
    codename: &str,
) -> Result<UpdateArchive> {
    validate_codename(codename)?;
    let bundle_dir = project_root.join(bundle_dir);
    let output_dir = project_root.join(output_dir);

    if !bundle_dir.is_dir() {
        return Err(BundlerError::GenericError(format!(
            "Bundle directory not found: {}",
            bundle_dir.display()
        )));
    }

    log::info!("Packaging bundle as update file");
    log::info!("Bundle path: {}", bundle_dir.display());
    log::info!("Output directory: {}", output_dir.display());

    runner
        .run(&packaging_steps(&bundle_dir, &output_dir, codename), project_root)
        .await?;

    let path = output_dir.join(archive_file_name(codename));
    let size = tokio::fs::metadata(&path)
        .await
        .fs_context("reading archive metadata", &path)?
        .len();
    let checksum = calculate_sha256(&path).await?;

    log::info!("✓ Update file output to {} ({} bytes)", path.display(), size);
    log::info!("SHA256: {}", checksum);

    Ok(UpdateArchive {
        codename: codename.to_string(),
        path,
        size,
        checksum,
    })
}

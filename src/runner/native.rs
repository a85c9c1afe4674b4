//! In-process step execution.

use super::archive::{TarCompression, extract_tar, zip_directory};
use super::{CommandExecutor, ShellExecutor, Step, matching_files, shell::run_process};
use crate::error::{BundlerError, ErrorExt, Result};
use std::io;
use std::path::Path;
use tokio::fs;

/// Executes filesystem and archive steps with native APIs.
///
/// Only [`Step::Run`] spawns a process, plus `tar` for artifacts compressed
/// with bzip2, xz or zstd.
#[derive(Debug, Clone, Default)]
pub struct NativeExecutor;

impl NativeExecutor {
    /// Creates a native executor.
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for NativeExecutor {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn execute(&self, step: &Step, cwd: &Path) -> Result<()> {
        match step {
            Step::RemoveDir(path) => match fs::remove_dir_all(path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
                Err(e) => Err(e).fs_context("removing directory", path),
            },
            Step::CreateDir(path) => fs::create_dir_all(path)
                .await
                .fs_context("creating directory", path),
            Step::RemoveFile(path) => remove_file(path).await,
            Step::RemoveMatching { dir, extension } => {
                for path in matching_files(dir, extension)? {
                    log::debug!("removing stray {}", path.display());
                    remove_file(&path).await?;
                }
                Ok(())
            }
            Step::Move { from, to } => move_path(from, to).await,
            Step::Zip {
                source_dir,
                archive,
            } => {
                let source_dir = source_dir.clone();
                let archive = archive.clone();
                let files = tokio::task::spawn_blocking(move || {
                    zip_directory(&source_dir, &archive)
                })
                .await
                .map_err(|e| {
                    BundlerError::GenericError(format!("Zip task panicked: {}", e))
                })??;
                log::debug!("archived {} files", files);
                Ok(())
            }
            Step::ExtractTar { archive, dest } => {
                let compression = TarCompression::detect(archive)?;
                if !compression.is_native() {
                    log::info!(
                        "{} is {}-compressed, unpacking with tar",
                        archive.display(),
                        compression
                    );
                    fs::create_dir_all(dest)
                        .await
                        .fs_context("creating directory", dest)?;
                    let (invocation, dir) = ShellExecutor::command_for(step, cwd);
                    return run_process(&invocation, &dir).await;
                }

                let archive = archive.clone();
                let dest = dest.clone();
                tokio::task::spawn_blocking(move || extract_tar(&archive, &dest))
                    .await
                    .map_err(|e| {
                        BundlerError::GenericError(format!("Tar extraction task panicked: {}", e))
                    })?
            }
            Step::Run(invocation) => run_process(invocation, cwd).await,
        }
    }
}

async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Renames `from` to `to`, falling back to copy + delete across filesystems.
async fn move_path(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices && from.is_file() => {
            log::debug!(
                "{} and {} are on different filesystems, copying",
                from.display(),
                to.display()
            );
            fs::copy(from, to).await.fs_context("copying file", to)?;
            fs::remove_file(from)
                .await
                .fs_context("removing moved file", from)
        }
        Err(e) => Err(e).fs_context("moving file", from),
    }
}

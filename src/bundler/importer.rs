//! Update archives from Yocto build artifacts.
//!
//! The Yocto image build installs the player bundle under
//! `usr/share/<app-name>` in the root filesystem and ships that tree as a tar
//! artifact. Importing unpacks the artifact into a scratch directory, reads
//! the codename the build stamped into the bundle, and packages the bundle.

use super::codename::{CODENAME_FILE, read_codename_file};
use super::packager::{UpdateArchive, package_bundle_as_update};
use super::settings::ImportSettings;
use crate::bail;
use crate::error::Result;
use crate::runner::{CommandExecutor, Step, StepRunner};
use std::path::{Path, PathBuf};

/// Inputs of a single import run.
#[derive(Debug, Clone)]
pub struct YoctoImport {
    /// Project root used as working directory
    pub project_root: PathBuf,
    /// Tar artifact produced by the Yocto build
    pub artifact: PathBuf,
    /// Location of the rootfs inside the artifact, if not at its root
    pub rootfs_path: Option<PathBuf>,
    /// Directory receiving the update archive
    pub output_dir: PathBuf,
}

/// Steps that give a clean work directory holding the extracted artifact.
pub fn extraction_steps(work_dir: &Path, artifact: &Path) -> Vec<Step> {
    vec![
        Step::RemoveDir(work_dir.to_path_buf()),
        Step::CreateDir(work_dir.to_path_buf()),
        Step::ExtractTar {
            archive: artifact.to_path_buf(),
            dest: work_dir.to_path_buf(),
        },
    ]
}

/// Extracts `import.artifact` and packages the bundle it contains.
///
/// The work directory is deleted and recreated first so nothing from an
/// earlier run can end up in the archive. A missing codename file fails the
/// import before any archive is written.
pub async fn import_yocto_artifact<E: CommandExecutor>(
    runner: &StepRunner<E>,
    settings: &ImportSettings,
    import: &YoctoImport,
) -> Result<UpdateArchive> {
    let work_dir = import.project_root.join(settings.work_dir_path());
    if work_dir.parent().is_none() {
        bail!("Refusing to use {} as work directory", work_dir.display());
    }

    log::info!("Deleting and recreating work directory at {}", work_dir.display());
    log::info!(
        "Unpacking tar archive from {} to {}",
        import.artifact.display(),
        work_dir.display()
    );
    runner
        .run(&extraction_steps(&work_dir, &import.artifact), &import.project_root)
        .await?;

    let settings = settings.clone().work_dir(&work_dir);
    let bundle_path = settings.bundle_path(import.rootfs_path.as_deref());

    log::info!(
        "Reading version codename from {} bundle at {}",
        settings.app_name_str(),
        bundle_path.display()
    );
    let codename = read_codename_file(&bundle_path.join(CODENAME_FILE)).await?;
    log::info!("Codename: {}", codename);

    package_bundle_as_update(
        runner,
        &import.project_root,
        &bundle_path,
        &import.output_dir,
        &codename,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BundlerError;
    use crate::runner::{NativeExecutor, ShellExecutor};

    fn write_artifact(path: &Path, prefix: &str, codename: Option<&str>) {
        let mut builder = tar::Builder::new(std::fs::File::create(path).unwrap());
        let mut files: Vec<(String, Vec<u8>)> = vec![
            (
                format!("{prefix}usr/share/castboard-player/performer"),
                b"\x7fELF".to_vec(),
            ),
            (
                format!("{prefix}usr/share/castboard-player/lib/libflutter_engine.so"),
                vec![1u8; 2048],
            ),
            (format!("{prefix}etc/hostname"), b"castboard".to_vec()),
        ];
        if let Some(codename) = codename {
            files.push((
                format!("{prefix}usr/share/castboard-player/codename"),
                format!("{codename}\n").into_bytes(),
            ));
        }
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, &data[..]).unwrap();
        }
        builder.finish().unwrap();
    }

    fn request(root: &Path, artifact: PathBuf, rootfs: Option<&str>) -> YoctoImport {
        YoctoImport {
            project_root: root.to_path_buf(),
            artifact,
            rootfs_path: rootfs.map(PathBuf::from),
            output_dir: root.join("out"),
        }
    }

    fn zip_names(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        let mut names: Vec<_> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .filter(|n| !n.ends_with('/'))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn packages_bundle_named_after_codename() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("core-image.tar");
        write_artifact(&artifact, "", Some("nightly-42"));
        let settings = ImportSettings::new().work_dir(tmp.path().join("work"));
        let runner = StepRunner::new(NativeExecutor::new());

        let archive = import_yocto_artifact(&runner, &settings, &request(tmp.path(), artifact, None))
            .await
            .unwrap();

        assert_eq!(archive.codename, "nightly-42");
        assert_eq!(archive.path, tmp.path().join("out/nightly-42.zip"));
        assert_eq!(
            zip_names(&archive.path),
            vec!["codename", "lib/libflutter_engine.so", "performer"]
        );
    }

    #[tokio::test]
    async fn rootfs_path_qualifies_bundle_location() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("deploy.tar");
        write_artifact(&artifact, "rootfs/", Some("v3"));
        let settings = ImportSettings::new().work_dir(tmp.path().join("work"));
        let runner = StepRunner::new(NativeExecutor::new());

        let archive = import_yocto_artifact(
            &runner,
            &settings,
            &request(tmp.path(), artifact, Some("/rootfs")),
        )
        .await
        .unwrap();

        assert_eq!(archive.path, tmp.path().join("out/v3.zip"));
    }

    #[tokio::test]
    async fn stale_work_files_are_cleared() {
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        let stale_bundle = work.join("usr/share/castboard-player");
        std::fs::create_dir_all(&stale_bundle).unwrap();
        std::fs::write(work.join("unrelated.txt"), b"stale").unwrap();
        std::fs::write(stale_bundle.join("old-asset.bin"), b"stale").unwrap();

        let artifact = tmp.path().join("core-image.tar");
        write_artifact(&artifact, "", Some("nightly-43"));
        let settings = ImportSettings::new().work_dir(&work);
        let runner = StepRunner::new(NativeExecutor::new());

        let archive = import_yocto_artifact(&runner, &settings, &request(tmp.path(), artifact, None))
            .await
            .unwrap();

        assert!(!work.join("unrelated.txt").exists());
        assert!(!zip_names(&archive.path).contains(&"old-asset.bin".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn imports_through_external_tools() {
        if ShellExecutor::preflight().is_err() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::write(work.join("unrelated.txt"), b"stale").unwrap();
        let artifact = tmp.path().join("core-image.tar");
        write_artifact(&artifact, "", Some("nightly-42"));
        let settings = ImportSettings::new().work_dir(&work);
        let runner = StepRunner::new(ShellExecutor::new());

        let archive = import_yocto_artifact(&runner, &settings, &request(tmp.path(), artifact, None))
            .await
            .unwrap();

        assert_eq!(archive.path, tmp.path().join("out/nightly-42.zip"));
        assert_eq!(
            zip_names(&archive.path),
            vec!["codename", "lib/libflutter_engine.so", "performer"]
        );
        assert!(!work.join("unrelated.txt").exists());
    }

    #[tokio::test]
    async fn missing_codename_fails_before_zipping() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("core-image.tar");
        write_artifact(&artifact, "", None);
        let settings = ImportSettings::new().work_dir(tmp.path().join("work"));
        let runner = StepRunner::new(NativeExecutor::new());

        let err = import_yocto_artifact(&runner, &settings, &request(tmp.path(), artifact, None))
            .await
            .unwrap_err();

        assert!(matches!(err, BundlerError::CodenameNotFound { .. }));
        assert!(!tmp.path().join("out").exists());
        assert!(
            !tmp.path()
                .join("work/usr/share/castboard-player")
                .read_dir()
                .unwrap()
                .any(|e| e.unwrap().path().extension().is_some_and(|x| x == "zip"))
        );
    }

    #[tokio::test]
    async fn corrupt_artifact_produces_no_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let artifact = tmp.path().join("corrupt.tar");
        std::fs::write(&artifact, vec![b'x'; 4096]).unwrap();
        let settings = ImportSettings::new().work_dir(tmp.path().join("work"));
        let runner = StepRunner::new(NativeExecutor::new());

        let result =
            import_yocto_artifact(&runner, &settings, &request(tmp.path(), artifact, None)).await;

        assert!(result.is_err());
        assert!(!tmp.path().join("out").exists());
    }
}

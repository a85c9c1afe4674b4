//! Native release builds through the cross-compilation tool.

use super::codename::{extract_codename, stamp_codename};
use super::packager::{UpdateArchive, package_bundle_as_update};
use super::settings::ReleaseSettings;
use crate::error::Result;
use crate::runner::{CommandExecutor, Invocation, Step, StepRunner, tool_detection::require_tool};
use std::path::{Path, PathBuf};

/// Drives the eLinux build of a Flutter project and packages the result.
///
/// # Process
///
/// 1. Removes the generated platform project folder
/// 2. Cleans and re-creates the platform project
/// 3. Fetches dependencies
/// 4. Cross-compiles the release bundle
/// 5. Renames the executable to the name the device expects
/// 6. Stamps the codename into the bundle
/// 7. Packages the bundle as an update archive
pub struct ReleaseBuilder<'a, E> {
    runner: &'a StepRunner<E>,
    project_root: PathBuf,
    settings: ReleaseSettings,
}

impl<'a, E: CommandExecutor> ReleaseBuilder<'a, E> {
    /// Creates a builder for the project at `project_root`.
    pub fn new(runner: &'a StepRunner<E>, project_root: &Path, settings: ReleaseSettings) -> Self {
        Self {
            runner,
            project_root: project_root.to_path_buf(),
            settings,
        }
    }

    /// Returns the release settings.
    pub fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    /// Absolute path of the bundle produced by the build.
    pub fn bundle_dir(&self) -> PathBuf {
        self.project_root.join(&self.settings.bundle_dir)
    }

    /// Fails unless the build tool is on `PATH`.
    pub fn preflight(&self) -> Result<PathBuf> {
        require_tool(&self.settings.build_tool)
    }

    /// Steps that prepare the platform project and compile the bundle.
    pub fn build_steps(&self) -> Vec<Step> {
        let tool = &self.settings.build_tool;
        let bundle_dir = self.bundle_dir();

        vec![
            Step::RemoveDir(self.settings.platform_dir.clone()),
            Step::Run(Invocation::new(tool, ["clean"])),
            Step::Run(Invocation::new(tool, ["create", "--platforms", "elinux", "."])),
            Step::Run(Invocation::new(tool, ["pub", "get"])),
            Step::Run(Invocation::new(tool, self.settings.build_args())),
            Step::Move {
                from: bundle_dir.join(&self.settings.executable_name),
                to: bundle_dir.join(&self.settings.target_executable_name),
            },
        ]
    }

    /// Builds the bundle and returns its path.
    pub async fn build(&self) -> Result<PathBuf> {
        log::info!("Building eLinux release in {}", self.project_root.display());
        self.runner
            .run(&self.build_steps(), &self.project_root)
            .await?;
        Ok(self.bundle_dir())
    }

    /// Builds, stamps and packages the release.
    ///
    /// The codename comes from `codename` when given, otherwise from the
    /// `kVersionCodename` literal in the project sources. It is resolved
    /// before the build starts so a missing literal fails fast. The archive
    /// goes to `output_dir`, or the configured output directory.
    pub async fn release(
        &self,
        codename: Option<&str>,
        output_dir: Option<&Path>,
    ) -> Result<UpdateArchive> {
        let codename = match codename {
            Some(codename) => codename.to_string(),
            None => {
                extract_codename(&self.project_root.join(&self.settings.codename_source)).await?
            }
        };
        log::info!("Release codename: {}", codename);

        let bundle_dir = self.build().await?;
        stamp_codename(&bundle_dir, &codename).await?;

        let output_dir = output_dir.unwrap_or(self.settings.output_dir.as_path());
        package_bundle_as_update(
            self.runner,
            &self.project_root,
            &bundle_dir,
            output_dir,
            &codename,
        )
        .await
    }
}

//! Release build configuration.

use crate::error::{ErrorExt, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "castboard_build.toml";

/// Configuration for the eLinux release build.
///
/// Defaults reproduce the Raspberry Pi arm64 build. Any field can be
/// overridden from the `[release]` table of [`CONFIG_FILE_NAME`] in the
/// project root.
///
/// # Configuration
///
/// ```toml
/// [release]
/// target_sysroot = "/opt/sysroots/arm64"
/// output_dir = "dist/rpi"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSettings {
    /// Cross-compilation build tool.
    ///
    /// Default: `flutter-elinux`
    pub build_tool: String,

    /// Platform project subfolder regenerated on every build.
    ///
    /// Default: `elinux`
    pub platform_dir: PathBuf,

    /// Compile-time definitions passed as `--dart-define`.
    pub dart_defines: Vec<String>,

    /// Target CPU architecture.
    ///
    /// Default: `arm64`
    pub target_arch: String,

    /// Sysroot of the target device.
    pub target_sysroot: PathBuf,

    /// Extra system include directories for the target toolchain.
    pub system_include_dirs: Vec<PathBuf>,

    /// Bundle directory produced by the build, relative to the project root.
    pub bundle_dir: PathBuf,

    /// Executable name as produced by the build tool.
    pub executable_name: String,

    /// Executable name expected on the device.
    pub target_executable_name: String,

    /// Dart source holding the `kVersionCodename` literal, relative to the
    /// project root.
    pub codename_source: PathBuf,

    /// Directory receiving the update archive, relative to the project root.
    pub output_dir: PathBuf,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            build_tool: "flutter-elinux".to_string(),
            platform_dir: PathBuf::from("elinux"),
            dart_defines: vec![
                "ELINUX_IS_ELINUX=true".to_string(),
                "ELINUX_TMP_PATH=/tmp/".to_string(),
                "ELINUX_HOME_PATH=/home/cage".to_string(),
            ],
            target_arch: "arm64".to_string(),
            target_sysroot: PathBuf::from("/opt/ubuntu18-arm64-sysroot"),
            system_include_dirs: vec![PathBuf::from(
                "/usr/aarch64-linux-gnu/include/c++/9/aarch64-linux-gnu",
            )],
            bundle_dir: PathBuf::from("build/elinux/arm64/release/bundle"),
            executable_name: "castboard_performer".to_string(),
            target_executable_name: "performer".to_string(),
            codename_source: PathBuf::from("lib/versionCodename.dart"),
            output_dir: PathBuf::from("build/elinux/rpi/release"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    release: Option<ReleaseSettings>,
}

impl ReleaseSettings {
    /// Loads settings for `project_root`.
    ///
    /// Reads `config` when given, otherwise [`CONFIG_FILE_NAME`] in the
    /// project root if it exists. Without a file the defaults apply.
    pub fn load(project_root: &Path, config: Option<&Path>) -> Result<Self> {
        let path = match config {
            Some(path) => path.to_path_buf(),
            None => {
                let default = project_root.join(CONFIG_FILE_NAME);
                if !default.is_file() {
                    log::debug!("no {} in {}, using defaults", CONFIG_FILE_NAME, project_root.display());
                    return Ok(Self::default());
                }
                default
            }
        };

        log::info!("Loading release settings from {}", path.display());
        let text = std::fs::read_to_string(&path).fs_context("reading build config", &path)?;
        Self::from_toml(&text)
    }

    /// Parses settings from the text of a config file.
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.release.unwrap_or_default())
    }

    /// Arguments for the build invocation.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["build".to_string(), "elinux".to_string()];
        args.extend(self.dart_defines.iter().map(|d| format!("--dart-define={d}")));
        args.push(format!("--target-arch={}", self.target_arch));
        args.push(format!("--target-sysroot={}", self.target_sysroot.display()));
        args.extend(
            self.system_include_dirs
                .iter()
                .map(|dir| format!("--system-include-directories={}", dir.display())),
        );
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_build_args_target_rpi() {
        assert_eq!(
            ReleaseSettings::default().build_args(),
            vec![
                "build",
                "elinux",
                "--dart-define=ELINUX_IS_ELINUX=true",
                "--dart-define=ELINUX_TMP_PATH=/tmp/",
                "--dart-define=ELINUX_HOME_PATH=/home/cage",
                "--target-arch=arm64",
                "--target-sysroot=/opt/ubuntu18-arm64-sysroot",
                "--system-include-directories=/usr/aarch64-linux-gnu/include/c++/9/aarch64-linux-gnu",
            ]
        );
    }

    #[test]
    fn partial_table_overrides_only_named_fields() {
        let settings = ReleaseSettings::from_toml(
            r#"
            [release]
            target_sysroot = "/opt/sysroots/arm64"
            output_dir = "dist/rpi"
            "#,
        )
        .unwrap();

        assert_eq!(settings.target_sysroot, PathBuf::from("/opt/sysroots/arm64"));
        assert_eq!(settings.output_dir, PathBuf::from("dist/rpi"));
        assert_eq!(settings.build_tool, "flutter-elinux");
        assert_eq!(settings.target_executable_name, "performer");
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(ReleaseSettings::from_toml("[release]\ntarget_sysrot = \"/x\"\n").is_err());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            ReleaseSettings::load(tmp.path(), None).unwrap(),
            ReleaseSettings::default()
        );
    }

    #[test]
    fn project_config_file_is_read() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[release]\nbuild_tool = \"/opt/flutter-elinux/bin/flutter-elinux\"\n",
        )
        .unwrap();

        let settings = ReleaseSettings::load(tmp.path(), None).unwrap();
        assert_eq!(settings.build_tool, "/opt/flutter-elinux/bin/flutter-elinux");
    }
}

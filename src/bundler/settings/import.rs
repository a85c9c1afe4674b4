//! Yocto import configuration.

use std::path::{Path, PathBuf};

/// Application directory name under `usr/share` in the Yocto rootfs.
pub const DEFAULT_APP_NAME: &str = "castboard-player";

/// Returns the default work directory for tar extraction.
///
/// `$TMPDIR/castboard_build_scripts/yocto_build_artifacts`
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir()
        .join("castboard_build_scripts")
        .join("yocto_build_artifacts")
}

/// Settings for importing bundles from Yocto artifacts.
///
/// # Examples
///
/// ```
/// use castboard_bundler::bundler::ImportSettings;
///
/// let settings = ImportSettings::new()
///     .app_name("castboard-performer")
///     .work_dir("/var/tmp/castboard");
/// assert_eq!(settings.app_name_str(), "castboard-performer");
/// ```
#[derive(Debug, Clone)]
pub struct ImportSettings {
    app_name: String,
    work_dir: PathBuf,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            work_dir: default_work_dir(),
        }
    }
}

impl ImportSettings {
    /// Creates settings with the default app name and work directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application directory name looked up under `usr/share`.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets the directory the artifact is extracted into.
    ///
    /// The directory is deleted and recreated on every import.
    pub fn work_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.work_dir = path.as_ref().to_path_buf();
        self
    }

    /// Returns the application directory name.
    pub fn app_name_str(&self) -> &str {
        &self.app_name
    }

    /// Returns the extraction directory.
    pub fn work_dir_path(&self) -> &Path {
        &self.work_dir
    }

    /// Location of the application bundle inside the extracted tree.
    ///
    /// `<work_dir>/[<rootfs_path>/]usr/share/<app_name>`. A leading `/` on
    /// `rootfs_path` is ignored.
    pub fn bundle_path(&self, rootfs_path: Option<&Path>) -> PathBuf {
        let root = match rootfs_path {
            Some(sub) => self.work_dir.join(sub.strip_prefix("/").unwrap_or(sub)),
            None => self.work_dir.clone(),
        };
        root.join("usr").join("share").join(&self.app_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_path_without_rootfs() {
        let settings = ImportSettings::new().work_dir("/tmp/work");
        assert_eq!(
            settings.bundle_path(None),
            PathBuf::from("/tmp/work/usr/share/castboard-player")
        );
    }

    #[test]
    fn bundle_path_with_absolute_rootfs() {
        let settings = ImportSettings::new()
            .work_dir("/tmp/work")
            .app_name("castboard-performer");
        assert_eq!(settings.app_name_str(), "castboard-performer");
        assert_eq!(
            settings.bundle_path(Some(Path::new("/rootfs"))),
            PathBuf::from("/tmp/work/rootfs/usr/share/castboard-performer")
        );
    }

    #[test]
    fn default_work_dir_is_under_temp() {
        assert!(default_work_dir().starts_with(std::env::temp_dir()));
    }
}

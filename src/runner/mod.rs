//! Sequential step execution.
//!
//! Every pipeline in this crate is a flat list of [`Step`]s handed to a
//! [`StepRunner`]. The runner executes them one at a time through a
//! [`CommandExecutor`] and stops at the first failure. There is no
//! rollback and no retry.
//!
//! After each step the runner checks the step's postcondition on disk
//! (see [`Step::verify`]) before moving on. An optional settle delay can be
//! configured for environments where external tools finish writing after
//! they exit.
//!
//! # Module Organization
//!
//! - [`archive`] - zip creation and tar extraction with native crates
//! - [`native`] - [`NativeExecutor`], filesystem and archive steps in-process
//! - [`shell`] - [`ShellExecutor`], every step through external Unix tools
//! - [`tool_detection`] - `PATH` lookup for required tools

pub mod archive;
mod native;
mod shell;
pub mod tool_detection;

#[cfg(test)]
pub(crate) mod testing;

pub use native::NativeExecutor;
pub use shell::{ShellExecutor, run_process};

use crate::error::{BundlerError, Result};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments passed verbatim, without shell interpretation
    pub args: Vec<String>,
}

impl Invocation {
    /// Creates an invocation of `program` with `args`.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the invocation as a command line for logs and errors.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '"', '\'', '\t']) {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('"', "\\\""))
    }
}

/// One unit of work in a pipeline.
///
/// Relative paths are resolved against the runner's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Recursively delete a directory; succeeds if it is already gone
    RemoveDir(PathBuf),
    /// Create a directory and its parents; succeeds if it already exists
    CreateDir(PathBuf),
    /// Delete a single file; succeeds if it is already gone
    RemoveFile(PathBuf),
    /// Delete every top-level file in `dir` with the given extension
    RemoveMatching {
        /// Directory to clean
        dir: PathBuf,
        /// Extension without the leading dot
        extension: String,
    },
    /// Rename a file or directory
    Move {
        /// Source path
        from: PathBuf,
        /// Full destination path
        to: PathBuf,
    },
    /// Recursively zip the contents of `source_dir` into `archive`
    Zip {
        /// Directory whose contents are archived
        source_dir: PathBuf,
        /// Archive file to create
        archive: PathBuf,
    },
    /// Unpack a tar archive into `dest`
    ExtractTar {
        /// Tar file, optionally gzip-compressed
        archive: PathBuf,
        /// Extraction root
        dest: PathBuf,
    },
    /// Run an external program in the working directory
    Run(Invocation),
}

impl Step {
    /// Returns a copy with every path made absolute against `cwd`.
    pub fn resolve(&self, cwd: &Path) -> Step {
        let abs = |p: &PathBuf| cwd.join(p);
        match self {
            Step::RemoveDir(p) => Step::RemoveDir(abs(p)),
            Step::CreateDir(p) => Step::CreateDir(abs(p)),
            Step::RemoveFile(p) => Step::RemoveFile(abs(p)),
            Step::RemoveMatching { dir, extension } => Step::RemoveMatching {
                dir: abs(dir),
                extension: extension.clone(),
            },
            Step::Move { from, to } => Step::Move {
                from: abs(from),
                to: abs(to),
            },
            Step::Zip {
                source_dir,
                archive,
            } => Step::Zip {
                source_dir: abs(source_dir),
                archive: abs(archive),
            },
            Step::ExtractTar { archive, dest } => Step::ExtractTar {
                archive: abs(archive),
                dest: abs(dest),
            },
            Step::Run(invocation) => Step::Run(invocation.clone()),
        }
    }

    /// Checks that the step's effect is visible on disk.
    ///
    /// Expects a step already passed through [`Step::resolve`].
    pub fn verify(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(BundlerError::StepVerification {
                step: self.to_string(),
                reason,
            })
        };

        match self {
            Step::RemoveDir(p) | Step::RemoveFile(p) => {
                if path_exists(p) {
                    return fail(format!("{} still exists", p.display()));
                }
            }
            Step::CreateDir(p) => {
                if !p.is_dir() {
                    return fail(format!("{} is not a directory", p.display()));
                }
            }
            Step::RemoveMatching { dir, extension } => {
                let leftovers = matching_files(dir, extension)?;
                if let Some(first) = leftovers.first() {
                    return fail(format!("{} still exists", first.display()));
                }
            }
            Step::Move { from, to } => {
                if !path_exists(to) {
                    return fail(format!("{} was not created", to.display()));
                }
                if path_exists(from) {
                    return fail(format!("{} still exists", from.display()));
                }
            }
            Step::Zip { archive, .. } => {
                if !archive.is_file() {
                    return fail(format!("archive {} was not written", archive.display()));
                }
            }
            Step::ExtractTar { dest, .. } => {
                if !dest.is_dir() {
                    return fail(format!("{} is not a directory", dest.display()));
                }
            }
            Step::Run(_) => {}
        }
        Ok(())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::RemoveDir(p) => write!(f, "remove directory {}", p.display()),
            Step::CreateDir(p) => write!(f, "create directory {}", p.display()),
            Step::RemoveFile(p) => write!(f, "remove file {}", p.display()),
            Step::RemoveMatching { dir, extension } => {
                write!(f, "remove *.{} from {}", extension, dir.display())
            }
            Step::Move { from, to } => write!(f, "move {} -> {}", from.display(), to.display()),
            Step::Zip {
                source_dir,
                archive,
            } => write!(f, "zip {} -> {}", source_dir.display(), archive.display()),
            Step::ExtractTar { archive, dest } => {
                write!(f, "extract {} -> {}", archive.display(), dest.display())
            }
            Step::Run(invocation) => write!(f, "run {}", invocation.command_line()),
        }
    }
}

fn path_exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Lists top-level files in `dir` ending in `.{extension}`.
///
/// Hidden files are not matched, like a shell `*` glob. A missing directory
/// has no matches.
pub(crate) fn matching_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        extension
    );
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut matches = Vec::new();
    for entry in glob::glob_with(&pattern, options)? {
        let path = entry.map_err(|e| BundlerError::Fs {
            context: "listing matching files".to_string(),
            path: e.path().to_path_buf(),
            source: std::io::Error::new(e.error().kind(), e.to_string()),
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }
    Ok(matches)
}

/// Capability interface for executing pipeline steps.
///
/// Implementations decide how each [`Step`] is carried out: in-process with
/// native APIs, or by spawning the equivalent Unix tool.
pub trait CommandExecutor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Executes a single resolved step with `cwd` as working directory.
    fn execute(&self, step: &Step, cwd: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Executor selected at runtime.
#[derive(Debug, Clone)]
pub enum AnyExecutor {
    /// In-process filesystem and archive operations
    Native(NativeExecutor),
    /// External Unix tools for every step
    Shell(ShellExecutor),
}

impl CommandExecutor for AnyExecutor {
    fn name(&self) -> &'static str {
        match self {
            AnyExecutor::Native(e) => e.name(),
            AnyExecutor::Shell(e) => e.name(),
        }
    }

    async fn execute(&self, step: &Step, cwd: &Path) -> Result<()> {
        match self {
            AnyExecutor::Native(e) => e.execute(step, cwd).await,
            AnyExecutor::Shell(e) => e.execute(step, cwd).await,
        }
    }
}

/// Runs step sequences, aborting on the first failure.
#[derive(Debug, Clone)]
pub struct StepRunner<E> {
    executor: E,
    settle_delay: Duration,
}

impl<E: CommandExecutor> StepRunner<E> {
    /// Creates a runner with no settle delay.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            settle_delay: Duration::ZERO,
        }
    }

    /// Sets a fixed pause inserted after every successful step.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Returns the executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Executes `steps` in order with `cwd` as working directory.
    ///
    /// Stops at the first step that fails or whose postcondition does not
    /// hold. Steps already executed are not undone.
    pub async fn run(&self, steps: &[Step], cwd: &Path) -> Result<()> {
        for step in steps {
            let step = step.resolve(cwd);
            log::info!("{}", step);

            if let Err(e) = self.executor.execute(&step, cwd).await {
                log::error!("***** Step failed: {} *****", step);
                log::error!("{}", e);
                return Err(e);
            }

            log::debug!("verifying: {}", step);
            step.verify().inspect_err(|e| log::error!("{}", e))?;

            if !self.settle_delay.is_zero() {
                tokio::time::sleep(self.settle_delay).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingExecutor;
    use super::*;

    #[test]
    fn command_line_quotes_arguments_with_spaces() {
        let invocation = Invocation::new("mv", ["/tmp/my bundle/a", "/tmp/b"]);
        assert_eq!(invocation.command_line(), "mv \"/tmp/my bundle/a\" /tmp/b");
    }

    #[test]
    fn resolve_joins_relative_paths_only() {
        let step = Step::Move {
            from: PathBuf::from("bundle/castboard_performer"),
            to: PathBuf::from("/abs/performer"),
        };
        let resolved = step.resolve(Path::new("/project"));
        assert_eq!(
            resolved,
            Step::Move {
                from: PathBuf::from("/project/bundle/castboard_performer"),
                to: PathBuf::from("/abs/performer"),
            }
        );
    }

    #[tokio::test]
    async fn runs_steps_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = StepRunner::new(RecordingExecutor::native());
        let steps = vec![
            Step::CreateDir(PathBuf::from("out/nested")),
            Step::RemoveDir(PathBuf::from("out/nested")),
        ];

        runner.run(&steps, tmp.path()).await.unwrap();

        let recorded = runner.executor().recorded();
        assert_eq!(
            recorded,
            vec![
                Step::CreateDir(tmp.path().join("out/nested")),
                Step::RemoveDir(tmp.path().join("out/nested")),
            ]
        );
        assert!(tmp.path().join("out").is_dir());
        assert!(!tmp.path().join("out/nested").exists());
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = StepRunner::new(RecordingExecutor::native().fail_on(|step| {
            matches!(step, Step::Run(inv) if inv.program == "flutter-elinux")
        }));
        let steps = vec![
            Step::CreateDir(PathBuf::from("first")),
            Step::Run(Invocation::new("flutter-elinux", ["pub", "get"])),
            Step::CreateDir(PathBuf::from("never")),
        ];

        let err = runner.run(&steps, tmp.path()).await.unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(tmp.path().join("first").is_dir());
        assert!(!tmp.path().join("never").exists());
        assert_eq!(runner.executor().recorded().len(), 2);
    }

    #[tokio::test]
    async fn unverified_step_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        // Recording-only executor never creates the directory.
        let runner = StepRunner::new(RecordingExecutor::dry());
        let err = runner
            .run(&[Step::CreateDir(PathBuf::from("missing"))], tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::StepVerification { .. }));
    }

    #[test]
    fn matching_files_skips_nested_and_hidden_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("old.zip"), b"z").unwrap();
        std::fs::write(tmp.path().join("keep.txt"), b"t").unwrap();
        std::fs::create_dir(tmp.path().join("lib")).unwrap();
        std::fs::write(tmp.path().join("lib/nested.zip"), b"z").unwrap();

        std::fs::write(tmp.path().join(".hidden.zip"), b"z").unwrap();

        let found = matching_files(tmp.path(), "zip").unwrap();
        assert_eq!(found, vec![tmp.path().join("old.zip")]);
    }

    #[test]
    fn matching_files_in_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(
            matching_files(&tmp.path().join("nope"), "zip")
                .unwrap()
                .is_empty()
        );
    }
}

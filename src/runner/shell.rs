//! External process execution.

use super::{CommandExecutor, Invocation, Step, tool_detection::require_tool};
use crate::error::{BundlerError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Unix tools the shell executor relies on.
pub const SHELL_TOOLS: &[&str] = &["sh", "rm", "mkdir", "mv", "zip", "tar"];

/// Runs `invocation` in `cwd` and waits for it to exit.
///
/// Standard output is passed through to the terminal. Standard error is
/// echoed line by line and also captured so that a failure carries the
/// tool's own diagnostics.
pub async fn run_process(invocation: &Invocation, cwd: &Path) -> Result<()> {
    let command_line = invocation.command_line();
    log::debug!("spawning `{}` in {}", command_line, cwd.display());

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BundlerError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;

    let mut captured = Vec::new();
    if let Some(stderr) = child.stderr.take() {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            eprintln!("{}", line);
            captured.push(line);
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|source| BundlerError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;

    if !status.success() {
        return Err(BundlerError::CommandFailed {
            command: command_line,
            code: status.code(),
            stderr: captured.join("\n"),
        });
    }

    Ok(())
}

/// Executes every step by spawning the equivalent Unix tool.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    /// Creates a shell executor.
    pub fn new() -> Self {
        Self
    }

    /// Fails unless every tool in [`SHELL_TOOLS`] is on `PATH`.
    pub fn preflight() -> Result<Vec<PathBuf>> {
        SHELL_TOOLS.iter().map(|tool| require_tool(tool)).collect()
    }

    /// Maps a resolved step to the command that performs it and the
    /// directory to run it in.
    pub fn command_for(step: &Step, cwd: &Path) -> (Invocation, PathBuf) {
        let arg = |p: &Path| p.to_string_lossy().into_owned();
        match step {
            Step::RemoveDir(p) => (Invocation::new("rm", ["-rf".to_string(), arg(p)]), cwd.into()),
            Step::CreateDir(p) => (
                Invocation::new("mkdir", ["-p".to_string(), arg(p)]),
                cwd.into(),
            ),
            Step::RemoveFile(p) => (Invocation::new("rm", ["-f".to_string(), arg(p)]), cwd.into()),
            Step::RemoveMatching { dir, extension } => (
                Invocation::new("sh", ["-c".to_string(), format!("rm -f -- *.{extension}")]),
                dir.clone(),
            ),
            Step::Move { from, to } => (Invocation::new("mv", [arg(from), arg(to)]), cwd.into()),
            Step::Zip {
                source_dir,
                archive,
            } => (
                Invocation::new(
                    "zip",
                    ["-r".to_string(), "-q".to_string(), arg(archive), ".".to_string()],
                ),
                source_dir.clone(),
            ),
            Step::ExtractTar { archive, dest } => (
                Invocation::new("tar", ["-xf".to_string(), arg(archive), "-C".to_string(), arg(dest)]),
                cwd.into(),
            ),
            Step::Run(invocation) => (invocation.clone(), cwd.into()),
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn execute(&self, step: &Step, cwd: &Path) -> Result<()> {
        let (invocation, dir) = Self::command_for(step, cwd);
        run_process(&invocation, &dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_runs_inside_bundle_directory() {
        let (invocation, dir) = ShellExecutor::command_for(
            &Step::Zip {
                source_dir: PathBuf::from("/tmp/bundle"),
                archive: PathBuf::from("/tmp/bundle/v1.zip"),
            },
            Path::new("/project"),
        );
        assert_eq!(invocation.command_line(), "zip -r -q /tmp/bundle/v1.zip .");
        assert_eq!(dir, PathBuf::from("/tmp/bundle"));
    }

    #[test]
    fn extract_maps_to_tar() {
        let (invocation, dir) = ShellExecutor::command_for(
            &Step::ExtractTar {
                archive: PathBuf::from("/art/rootfs.tar"),
                dest: PathBuf::from("/tmp/work"),
            },
            Path::new("/project"),
        );
        assert_eq!(invocation.command_line(), "tar -xf /art/rootfs.tar -C /tmp/work");
        assert_eq!(dir, PathBuf::from("/project"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_exit_code_and_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run_process(
            &Invocation::new("sh", ["-c", "echo broken >&2; exit 7"]),
            tmp.path(),
        )
        .await
        .unwrap_err();

        match err {
            BundlerError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(7));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run_process(
            &Invocation::new("castboard-no-such-tool", Vec::<String>::new()),
            tmp.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BundlerError::SpawnFailed { .. }));
    }
}

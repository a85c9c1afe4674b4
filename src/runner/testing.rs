//! Test double for [`CommandExecutor`].

use super::{CommandExecutor, NativeExecutor, Step};
use crate::error::{BundlerError, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

type FailPredicate = Arc<dyn Fn(&Step) -> bool + Send + Sync>;

/// Records every step it sees.
///
/// Filesystem and archive steps are optionally carried out by a
/// [`NativeExecutor`]; [`Step::Run`] is never spawned. Steps matching the
/// failure predicate return a command failure with exit code 3.
#[derive(Clone)]
pub(crate) struct RecordingExecutor {
    steps: Arc<Mutex<Vec<Step>>>,
    delegate: Option<NativeExecutor>,
    fail_on: Option<FailPredicate>,
}

impl RecordingExecutor {
    /// Records and performs non-`Run` steps natively.
    pub(crate) fn native() -> Self {
        Self {
            steps: Arc::default(),
            delegate: Some(NativeExecutor::new()),
            fail_on: None,
        }
    }

    /// Records without touching the filesystem.
    pub(crate) fn dry() -> Self {
        Self {
            steps: Arc::default(),
            delegate: None,
            fail_on: None,
        }
    }

    pub(crate) fn fail_on(mut self, predicate: impl Fn(&Step) -> bool + Send + Sync + 'static) -> Self {
        self.fail_on = Some(Arc::new(predicate));
        self
    }

    pub(crate) fn recorded(&self) -> Vec<Step> {
        self.steps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub(crate) fn recorded_runs(&self) -> Vec<String> {
        self.recorded()
            .into_iter()
            .filter_map(|step| match step {
                Step::Run(invocation) => Some(invocation.command_line()),
                _ => None,
            })
            .collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn execute(&self, step: &Step, cwd: &Path) -> Result<()> {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(step.clone());
        }

        if self.fail_on.as_ref().is_some_and(|f| f(step)) {
            return Err(BundlerError::CommandFailed {
                command: step.to_string(),
                code: Some(3),
                stderr: "simulated failure".to_string(),
            });
        }

        match (&self.delegate, step) {
            (_, Step::Run(_)) | (None, _) => Ok(()),
            (Some(native), _) => native.execute(step, cwd).await,
        }
    }
}

//! Trial producers backed by benchmark processes.
//!
//! Each trial spawns the cell's benchmark binary with its workload arguments,
//! waits for it to exit, and parses the elapsed milliseconds it prints. Trials
//! run one at a time on a shared single-threaded runtime so they never overlap.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use lockbench_core::{
    parse_elapsed, ImplementationKind, MatrixCell, TrialExecutionError, TrialInvocation,
    TrialProducer, TrialProducerFactory, TrialResult, WorkloadCase,
};
use tokio::process::Command;
use tokio::runtime::Runtime;
use tracing::trace;

/// Where the binary for one implementation is.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Built or otherwise present at this path.
    Ready(PathBuf),
    /// Expected at this path but not built.
    Unavailable(PathBuf),
}

/// Runs one benchmark binary per trial.
pub struct ProcessTrialProducer {
    program: Result<PathBuf, TrialExecutionError>,
    invocation: TrialInvocation,
    timeout: Option<Duration>,
    runtime: Arc<Runtime>,
}

impl ProcessTrialProducer {
    async fn execute(
        program: PathBuf,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<TrialResult, TrialExecutionError> {
        let mut command = Command::new(&program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawn_error = |e: std::io::Error| {
            TrialExecutionError::Spawn(format!("Failed to spawn {}: {}", program.display(), e))
        };

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| TrialExecutionError::Timeout(limit))?
                .map_err(spawn_error)?,
            None => command.output().await.map_err(spawn_error)?,
        };

        if !output.status.success() {
            return Err(TrialExecutionError::NonZeroExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_elapsed(&String::from_utf8_lossy(&output.stdout))
    }
}

impl TrialProducer for ProcessTrialProducer {
    fn run_trial(&mut self) -> Result<TrialResult, TrialExecutionError> {
        let program = self.program.clone()?;
        trace!(program = %program.display(), args = ?self.invocation.args, "Spawning trial");
        self.runtime.block_on(Self::execute(
            program,
            &self.invocation.args,
            self.timeout,
        ))
    }
}

/// Hands out [`ProcessTrialProducer`]s for matrix cells.
pub struct ProcessTrialFactory {
    artifacts: HashMap<ImplementationKind, Artifact>,
    timeout: Option<Duration>,
    runtime: Arc<Runtime>,
}

impl ProcessTrialFactory {
    /// Create a factory with no artifacts registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the process runtime cannot be created.
    pub fn new(timeout: Option<Duration>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            artifacts: HashMap::new(),
            timeout,
            runtime: Arc::new(runtime),
        })
    }

    pub fn with_artifact(mut self, kind: ImplementationKind, artifact: Artifact) -> Self {
        self.artifacts.insert(kind, artifact);
        self
    }

    pub fn artifact(&self, kind: ImplementationKind) -> Option<&Artifact> {
        self.artifacts.get(&kind)
    }
}

impl TrialProducerFactory for ProcessTrialFactory {
    type Producer = ProcessTrialProducer;

    fn producer_for(&self, case: &WorkloadCase, cell: &MatrixCell) -> ProcessTrialProducer {
        let program = match self.artifacts.get(&cell.kind) {
            Some(Artifact::Ready(path)) => Ok(path.clone()),
            Some(Artifact::Unavailable(path)) => {
                Err(TrialExecutionError::MissingArtifact(path.clone()))
            }
            None => Err(TrialExecutionError::MissingArtifact(PathBuf::from(
                cell.kind.label(),
            ))),
        };
        ProcessTrialProducer {
            program,
            invocation: TrialInvocation::for_cell(case, cell),
            timeout: self.timeout,
            runtime: Arc::clone(&self.runtime),
        }
    }
}

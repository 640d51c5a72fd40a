//! Command Runner: the single funnel for external process invocations.
//!
//! [`CommandRunner::run`] never raises for a failed command; the outcome is a
//! [`CommandResult`]. Failure policies are applied by [`execute`], driven by
//! the tag on each [`CommandSpec`].

use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::process::run_command;
use super::workspace::Workspace;
use crate::core::types::{CommandSpec, FailurePolicy};
use crate::error::{PipelineError, Result};

/// Outcome of one external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    pub exit_code: Option<i32>,
    /// Captured stdout then stderr.
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            exit_code: Some(0),
            output: output.into(),
        }
    }

    pub fn failure(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code,
            output: output.into(),
        }
    }
}

/// A command failure that was tolerated under `WarnAndContinue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub command: String,
    pub exit_code: Option<i32>,
    pub output: String,
}

impl CommandFailure {
    pub fn from_result(spec: &CommandSpec, result: &CommandResult) -> Self {
        Self {
            command: spec.to_string(),
            exit_code: result.exit_code,
            output: result.output.trim().to_string(),
        }
    }
}

/// Abstraction over process execution so tests can script outcomes.
pub trait CommandRunner {
    /// Run `program args...` in the workspace root until it exits.
    fn run(&self, workspace: &Workspace, program: &str, args: &[String]) -> CommandResult;
}

/// Runner that spawns real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = %program))]
    fn run(&self, workspace: &Workspace, program: &str, args: &[String]) -> CommandResult {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(workspace.root());
        match run_command(cmd, self.timeout, self.output_limit_bytes) {
            Ok(output) => {
                let text = output.combined_text();
                if output.status.success() && !output.timed_out {
                    CommandResult::success(text)
                } else {
                    CommandResult::failure(output.status.code(), text)
                }
            }
            Err(err) => CommandResult::failure(None, format!("{err:#}")),
        }
    }
}

/// Run `spec` and apply its failure policy.
///
/// Returns the result (successful or tolerated) or `ProcessFailure` when the
/// call site chose `AbortOnFailure`.
pub fn execute<R: CommandRunner + ?Sized>(
    runner: &R,
    workspace: &Workspace,
    spec: &CommandSpec,
) -> Result<CommandResult> {
    info!(command = %spec, "running");
    let result = runner.run(workspace, &spec.program, &spec.args);
    if result.succeeded {
        debug!(command = %spec, "command succeeded");
        return Ok(result);
    }
    match spec.policy {
        FailurePolicy::AbortOnFailure => Err(PipelineError::ProcessFailure {
            command: spec.to_string(),
            output: result.output.trim().to_string(),
        }),
        FailurePolicy::WarnAndContinue => {
            warn!(
                command = %spec,
                exit_code = ?result.exit_code,
                "command failed, continuing"
            );
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRunner(CommandResult);

    impl CommandRunner for FixedRunner {
        fn run(&self, _workspace: &Workspace, _program: &str, _args: &[String]) -> CommandResult {
            self.0.clone()
        }
    }

    #[test]
    fn abort_policy_raises_process_failure() {
        let ws = Workspace::new(".");
        let runner = FixedRunner(CommandResult::failure(Some(1), "boom\n"));
        let err = execute(&runner, &ws, &CommandSpec::abort("bundle", ["install"])).unwrap_err();
        match err {
            PipelineError::ProcessFailure { command, output } => {
                assert_eq!(command, "bundle install");
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn warn_policy_returns_failed_result() {
        let ws = Workspace::new(".");
        let runner = FixedRunner(CommandResult::failure(Some(1), "boom"));
        let result = execute(&runner, &ws, &CommandSpec::warn("git", ["commit"])).expect("tolerated");
        assert!(!result.succeeded);
    }

    #[test]
    fn missing_program_is_a_failed_result() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ws = Workspace::new(temp.path());
        let runner = ProcessRunner::new(None, 1024);
        let result = runner.run(&ws, "definitely-not-a-real-program-xyz", &[]);
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None);
        assert!(result.output.contains("spawn command"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_workspace_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "x").expect("seed");
        let ws = Workspace::new(temp.path());
        let runner = ProcessRunner::new(None, 1024);
        let result = runner.run(&ws, "ls", &[]);
        assert!(result.succeeded);
        assert!(result.output.contains("marker.txt"));
    }
}

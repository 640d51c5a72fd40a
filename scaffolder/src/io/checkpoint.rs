//! Checkpoint Manager: install dependencies, stage everything, commit.
//!
//! All three sub-commands always run, in order, under the configured policy.
//! With `WarnAndContinue` a failed commit is logged and recorded in the
//! outcome, and the pipeline moves on.

use tracing::{info, instrument, warn};

use super::git;
use super::runner::{CommandFailure, CommandRunner, execute};
use super::workspace::Workspace;
use crate::core::types::{CommandSpec, FailurePolicy};
use crate::error::Result;

/// Record of one checkpoint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointOutcome {
    pub message: String,
    /// Sub-commands that failed and were tolerated.
    pub failures: Vec<CommandFailure>,
}

impl CheckpointOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointManager {
    install_command: Vec<String>,
    policy: FailurePolicy,
}

impl CheckpointManager {
    pub fn new(install_command: Vec<String>, policy: FailurePolicy) -> Self {
        Self {
            install_command,
            policy,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// The sub-commands for `message`, in execution order.
    pub fn commands(&self, message: &str) -> Vec<CommandSpec> {
        let mut commands = Vec::with_capacity(3);
        if let Some(install) = CommandSpec::from_argv(&self.install_command, self.policy) {
            commands.push(install);
        }
        commands.push(git::add_all(self.policy));
        commands.push(git::commit(message, self.policy));
        commands
    }

    /// Make the current working tree durable as one commit.
    #[instrument(skip_all, fields(commit_message = message))]
    pub fn checkpoint<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        workspace: &Workspace,
        message: &str,
    ) -> Result<CheckpointOutcome> {
        let mut failures = Vec::new();
        for command in self.commands(message) {
            let result = execute(runner, workspace, &command)?;
            if !result.succeeded {
                failures.push(CommandFailure::from_result(&command, &result));
            }
        }
        if failures.is_empty() {
            info!(commit_message = message, "checkpoint committed");
        } else {
            warn!(
                commit_message = message,
                failed = failures.len(),
                "checkpoint incomplete, continuing"
            );
        }
        Ok(CheckpointOutcome {
            message: message.to_string(),
            failures,
        })
    }
}

//! Pipeline Orchestrator.
//!
//! Runs `git init`, then every step of the table strictly in order, each
//! followed by its checkpoint, then the enabled hosting adapters. Mutation
//! errors and `AbortOnFailure` commands stop the run; everything else is
//! recorded in the [`PipelineReport`].

use tracing::{error, info, instrument, warn};

use crate::core::types::{Action, CommandSpec, Step};
use crate::error::{PipelineError, Result};
use crate::hosting::{HostingAdapter, Provider, RemoteContext, RemoteWiring};
use crate::io::checkpoint::{CheckpointManager, CheckpointOutcome};
use crate::io::config::{Configuration, Settings};
use crate::io::git;
use crate::io::mutator::FileMutator;
use crate::io::runner::{CommandFailure, CommandRunner, execute};
use crate::io::templates::Templates;
use crate::io::workspace::Workspace;
use crate::steps::build_steps;

/// Branch pushed to providers that deploy a single branch when HEAD was unreadable.
const FALLBACK_BASE_BRANCH: &str = "master";

/// What happened with one hosting provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOutcome {
    pub provider: Provider,
    pub created: bool,
    pub url: Option<String>,
    /// Local remote the pushes went to.
    pub git_remote: Option<String>,
    pub pushed: bool,
    pub error: Option<String>,
}

impl RemoteOutcome {
    fn new(provider: Provider) -> Self {
        Self {
            provider,
            created: false,
            url: None,
            git_remote: None,
            pushed: false,
            error: None,
        }
    }
}

/// Audit trail for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Names of the steps that ran, in order.
    pub steps: Vec<String>,
    pub checkpoints: Vec<CheckpointOutcome>,
    /// Step or remote-wiring commands that failed under `WarnAndContinue`.
    pub command_failures: Vec<CommandFailure>,
    pub remotes: Vec<RemoteOutcome>,
}

impl PipelineReport {
    pub fn failed_checkpoints(&self) -> impl Iterator<Item = &CheckpointOutcome> {
        self.checkpoints.iter().filter(|outcome| !outcome.is_clean())
    }

    /// True when anything was tolerated rather than completed.
    pub fn has_warnings(&self) -> bool {
        self.failed_checkpoints().next().is_some()
            || !self.command_failures.is_empty()
            || self.remotes.iter().any(|remote| remote.error.is_some())
    }
}

/// Build the step table from `config` and run the whole pipeline.
pub fn run_pipeline<R: CommandRunner>(
    workspace: &Workspace,
    runner: &R,
    config: &Configuration,
    settings: &Settings,
    adapters: &[Box<dyn HostingAdapter>],
) -> Result<PipelineReport> {
    let templates = Templates::new()?;
    let steps = build_steps(config, settings, &templates)?;
    let checkpoints = CheckpointManager::new(
        settings.install_command.clone(),
        settings.checkpoint_failure_policy,
    );
    Orchestrator {
        workspace,
        runner,
        checkpoints: &checkpoints,
    }
    .run(config, &steps, adapters)
}

/// Drives a prepared step table.
pub struct Orchestrator<'a, R: CommandRunner> {
    pub workspace: &'a Workspace,
    pub runner: &'a R,
    pub checkpoints: &'a CheckpointManager,
}

impl<R: CommandRunner> Orchestrator<'_, R> {
    #[instrument(skip_all, fields(app = %config.app_name, steps = steps.len()))]
    pub fn run(
        &self,
        config: &Configuration,
        steps: &[Step],
        adapters: &[Box<dyn HostingAdapter>],
    ) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();

        execute(self.runner, self.workspace, &git::init())?;
        let base_branch = git::current_branch(self.runner, self.workspace)
            .unwrap_or_else(|| FALLBACK_BASE_BRANCH.to_string());

        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            info!("step {}/{}: {}", index + 1, total, step.name);
            self.run_step(step, &mut report).map_err(|err| {
                error!(step = %step.name, error = %err, "step aborted");
                PipelineError::StepFailed {
                    step: step.name.clone(),
                    source: Box::new(err),
                }
            })?;
            report.steps.push(step.name.clone());
        }

        for adapter in adapters {
            let outcome = self.provision(config, adapter.as_ref(), &base_branch, &mut report)?;
            report.remotes.push(outcome);
        }

        Ok(report)
    }

    fn run_step(&self, step: &Step, report: &mut PipelineReport) -> Result<()> {
        let mutator = FileMutator::new(self.workspace);
        if step.actions.is_empty() {
            info!(step = %step.name, "nothing to do");
        }
        for action in &step.actions {
            match action {
                Action::Mutate(mutation) => {
                    mutator.apply(mutation)?;
                }
                Action::Run(command) => {
                    self.run_tolerated(command, report)?;
                }
            }
        }
        if let Some(message) = &step.checkpoint {
            let outcome = self
                .checkpoints
                .checkpoint(self.runner, self.workspace, message)?;
            report.checkpoints.push(outcome);
        }
        Ok(())
    }

    /// Create one hosted remote and publish to it. Creation failure skips the push.
    #[instrument(skip_all, fields(provider = %adapter.provider()))]
    fn provision(
        &self,
        config: &Configuration,
        adapter: &dyn HostingAdapter,
        base_branch: &str,
        report: &mut PipelineReport,
    ) -> Result<RemoteOutcome> {
        let mut outcome = RemoteOutcome::new(adapter.provider());
        let name = adapter.remote_name(&config.app_name);
        info!(%name, "creating remote");

        let ctx = RemoteContext {
            workspace: self.workspace,
            runner: self.runner,
        };
        let remote = match adapter.create_remote(&ctx, &name, config.organization.as_deref()) {
            Ok(remote) => remote,
            Err(err) => {
                warn!(error = %err, "remote creation failed, skipping push");
                outcome.error = Some(err.to_string());
                return Ok(outcome);
            }
        };
        outcome.created = true;
        outcome.url = remote.url.clone();
        outcome.git_remote = Some(remote.git_remote.clone());

        let ready = match (adapter.wiring(), &remote.url) {
            (RemoteWiring::AttachOrigin, Some(url)) => {
                self.run_tolerated(&git::remote_add(&remote.git_remote, url), report)?
            }
            (RemoteWiring::AttachOrigin, None) => {
                warn!("provider returned no clone url, skipping push");
                false
            }
            (RemoteWiring::SelfWired, _) => true,
        };
        if !ready {
            return Ok(outcome);
        }

        let mut pushed = true;
        for command in adapter.push_commands(&remote, base_branch) {
            pushed &= self.run_tolerated(&command, report)?;
        }
        outcome.pushed = pushed;
        Ok(outcome)
    }

    /// Run under the command's own policy; record a tolerated failure.
    fn run_tolerated(&self, command: &CommandSpec, report: &mut PipelineReport) -> Result<bool> {
        let result = execute(self.runner, self.workspace, command)?;
        if !result.succeeded {
            report
                .command_failures
                .push(CommandFailure::from_result(command, &result));
        }
        Ok(result.succeeded)
    }
}

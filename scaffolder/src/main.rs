//! Rails project scaffolder.
//!
//! `run` applies the step table to a generated Rails application and prints
//! an audit report; `plan` prints the table without touching anything.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scaffolder::core::types::FailurePolicy;
use scaffolder::exit_codes;
use scaffolder::hosting::select_adapters;
use scaffolder::io::config::{
    Configuration, DatabaseCredentials, FeatureFlags, SETTINGS_FILE, Settings, load_settings,
};
use scaffolder::io::runner::ProcessRunner;
use scaffolder::io::templates::Templates;
use scaffolder::io::workspace::Workspace;
use scaffolder::logging;
use scaffolder::pipeline::{PipelineReport, run_pipeline};
use scaffolder::steps::{build_steps, render_plan};

#[derive(Parser)]
#[command(
    name = "scaffolder",
    version,
    about = "Apply an opinionated setup to a freshly generated Rails application"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every step against the project, committing after each stage.
    Run {
        #[command(flatten)]
        project: ProjectArgs,
        /// Abort the run when any checkpoint command fails.
        #[arg(long)]
        strict: bool,
    },
    /// Print the step table without changing anything.
    Plan {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Args)]
struct ProjectArgs {
    /// Application name; drives database and remote names.
    app_name: String,
    /// Project root (defaults to the current directory).
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Organization/team owning the hosted remotes.
    #[arg(long)]
    organization: Option<String>,
    #[arg(long)]
    database_username: Option<String>,
    #[arg(long)]
    database_password: Option<String>,
    /// Create a Heroku app and push to it.
    #[arg(long)]
    heroku: bool,
    /// Create a Bitbucket repository and push to it.
    #[arg(long)]
    bitbucket: bool,
    /// Create a GitHub repository and push to it.
    #[arg(long)]
    github: bool,
    /// Settings file (defaults to `<root>/scaffolder.toml`).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ProjectArgs {
    fn configuration(&self) -> Result<Configuration> {
        let config = Configuration {
            app_name: self.app_name.clone(),
            organization: self.organization.clone(),
            database: DatabaseCredentials {
                username: self.database_username.clone(),
                password: self.database_password.clone(),
            },
            features: FeatureFlags {
                heroku: self.heroku,
                bitbucket: self.bitbucket,
                github: self.github,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn settings(&self) -> Result<Settings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| self.root.join(SETTINGS_FILE));
        load_settings(&path).with_context(|| format!("load settings from {}", path.display()))
    }
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FAILED);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run { project, strict } => cmd_run(&project, strict),
        Command::Plan { project } => cmd_plan(&project),
    }
}

fn cmd_run(project: &ProjectArgs, strict: bool) -> Result<()> {
    let config = project.configuration()?;
    let mut settings = project.settings()?;
    if strict {
        settings.checkpoint_failure_policy = FailurePolicy::AbortOnFailure;
    }

    let root = project
        .root
        .canonicalize()
        .with_context(|| format!("resolve project root {}", project.root.display()))?;
    let workspace = Workspace::new(root);
    let runner = ProcessRunner::new(settings.command_timeout(), settings.output_limit_bytes);
    let adapters = select_adapters(&config.features, &settings);

    let report = run_pipeline(&workspace, &runner, &config, &settings, &adapters)
        .context("scaffolding aborted")?;
    print!("{}", render_report(&report));
    Ok(())
}

fn cmd_plan(project: &ProjectArgs) -> Result<()> {
    let config = project.configuration()?;
    let settings = project.settings()?;
    let templates = Templates::new()?;
    let steps = build_steps(&config, &settings, &templates)?;
    print!("{}", render_plan(&steps));
    Ok(())
}

fn render_report(report: &PipelineReport) -> String {
    let mut out = format!(
        "completed {} steps, {} checkpoints\n",
        report.steps.len(),
        report.checkpoints.len()
    );
    for outcome in report.failed_checkpoints() {
        out.push_str(&format!("checkpoint {:?} incomplete:\n", outcome.message));
        for failure in &outcome.failures {
            out.push_str(&format!("  {}\n", failure.command));
        }
    }
    for failure in &report.command_failures {
        out.push_str(&format!("command failed: {}\n", failure.command));
    }
    for remote in &report.remotes {
        let status = match (&remote.error, remote.pushed) {
            (Some(err), _) => format!("not created ({err})"),
            (None, true) => match &remote.git_remote {
                Some(git_remote) => format!("created and pushed to `{git_remote}`"),
                None => "created and pushed".to_string(),
            },
            (None, false) => "created, not pushed".to_string(),
        };
        out.push_str(&format!("{}: {}", remote.provider, status));
        if let Some(url) = &remote.url {
            out.push_str(&format!(" [{url}]"));
        }
        out.push('\n');
    }
    out
}

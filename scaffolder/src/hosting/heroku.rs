//! Heroku: provisioned through the `heroku` CLI, which adds a `heroku` remote.

use tracing::{info, instrument};

use super::{HostingAdapter, Provider, ProvisionedRemote, RemoteContext, RemoteWiring, find_url};
use crate::core::types::CommandSpec;
use crate::error::{PipelineError, Result};
use crate::io::git;

const REMOTE: &str = "heroku";

pub struct HerokuAdapter;

impl HostingAdapter for HerokuAdapter {
    fn provider(&self) -> Provider {
        Provider::Heroku
    }

    fn wiring(&self) -> RemoteWiring {
        RemoteWiring::SelfWired
    }

    /// Heroku app names allow only lowercase letters, digits and dashes.
    fn remote_name(&self, app_name: &str) -> String {
        app_name
            .chars()
            .map(|ch| match ch {
                'a'..='z' | '0'..='9' | '-' => ch,
                'A'..='Z' => ch.to_ascii_lowercase(),
                _ => '-',
            })
            .collect()
    }

    #[instrument(skip_all, fields(name = %name))]
    fn create_remote(
        &self,
        ctx: &RemoteContext<'_>,
        name: &str,
        organization: Option<&str>,
    ) -> Result<ProvisionedRemote> {
        let mut args = vec!["create".to_string(), name.to_string()];
        if let Some(team) = organization {
            args.push("--team".to_string());
            args.push(team.to_string());
        }
        let result = ctx.runner.run(ctx.workspace, "heroku", &args);
        if !result.succeeded {
            return Err(PipelineError::RemoteCreationFailure {
                provider: self.provider().to_string(),
                reason: result.output.trim().to_string(),
            });
        }
        let url = find_url(&result.output, "https://git.heroku.com/");
        info!(url = ?url, "heroku app created");
        Ok(ProvisionedRemote::new(REMOTE, url))
    }

    fn push_commands(&self, remote: &ProvisionedRemote, base_branch: &str) -> Vec<CommandSpec> {
        vec![git::push_branch(&remote.git_remote, base_branch)]
    }
}

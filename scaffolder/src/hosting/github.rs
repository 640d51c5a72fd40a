//! GitHub: provisioned through the `gh` CLI, which also adds the git remote.
//!
//! `gh` refuses to add a remote whose name is taken, so when `origin` already
//! points elsewhere (Bitbucket runs first) the repository is wired as `github`.

use tracing::{info, instrument};

use super::{HostingAdapter, Provider, ProvisionedRemote, RemoteContext, RemoteWiring, find_url};
use crate::core::types::CommandSpec;
use crate::error::{PipelineError, Result};
use crate::io::git;

const PREFERRED_REMOTE: &str = "origin";
const FALLBACK_REMOTE: &str = "github";

pub struct GithubAdapter;

impl GithubAdapter {
    fn pick_remote(ctx: &RemoteContext<'_>) -> &'static str {
        if git::remote_exists(ctx.runner, ctx.workspace, PREFERRED_REMOTE) {
            FALLBACK_REMOTE
        } else {
            PREFERRED_REMOTE
        }
    }
}

impl HostingAdapter for GithubAdapter {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    fn wiring(&self) -> RemoteWiring {
        RemoteWiring::SelfWired
    }

    #[instrument(skip_all, fields(name = %name))]
    fn create_remote(
        &self,
        ctx: &RemoteContext<'_>,
        name: &str,
        organization: Option<&str>,
    ) -> Result<ProvisionedRemote> {
        let repo = match organization {
            Some(org) => format!("{org}/{name}"),
            None => name.to_string(),
        };
        let remote = Self::pick_remote(ctx);
        let args = [
            "repo",
            "create",
            repo.as_str(),
            "--private",
            "--source",
            ".",
            "--remote",
            remote,
        ]
        .map(String::from);
        let result = ctx.runner.run(ctx.workspace, "gh", &args);
        if !result.succeeded {
            return Err(PipelineError::RemoteCreationFailure {
                provider: self.provider().to_string(),
                reason: result.output.trim().to_string(),
            });
        }
        let url = find_url(&result.output, "https://github.com/");
        info!(url = ?url, remote, "github repository created");
        Ok(ProvisionedRemote::new(remote, url))
    }

    fn push_commands(&self, remote: &ProvisionedRemote, _base_branch: &str) -> Vec<CommandSpec> {
        vec![git::push_all_with_upstream(&remote.git_remote)]
    }
}

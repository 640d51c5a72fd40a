//! Remote Integration Adapters.
//!
//! Each hosting provider implements [`HostingAdapter`]. The orchestrator picks
//! adapters from the feature flags and drives them the same way: create the
//! remote, wire it up if needed, push. A failed creation skips that provider's
//! push and nothing else.

mod bitbucket;
mod github;
mod heroku;

use std::fmt;

pub use bitbucket::{BitbucketAdapter, BitbucketCredentials};
pub use github::GithubAdapter;
pub use heroku::HerokuAdapter;

use crate::core::names::clean_app_name;
use crate::core::types::CommandSpec;
use crate::error::Result;
use crate::io::config::{FeatureFlags, Settings};
use crate::io::runner::CommandRunner;
use crate::io::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Heroku,
    Bitbucket,
    Github,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heroku => "heroku",
            Self::Bitbucket => "bitbucket",
            Self::Github => "github",
        })
    }
}

/// Who attaches the git remote after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWiring {
    /// The orchestrator adds the returned URL as `origin`; no URL means no push.
    AttachOrigin,
    /// The provider tooling adds its own remote; push whenever creation succeeded.
    SelfWired,
}

/// A created hosted repository and the local git remote that publishes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRemote {
    /// Local remote name pushes target.
    pub git_remote: String,
    /// Clone URL, when the provider exposes one.
    pub url: Option<String>,
}

impl ProvisionedRemote {
    pub fn new(git_remote: impl Into<String>, url: Option<String>) -> Self {
        Self {
            git_remote: git_remote.into(),
            url,
        }
    }
}

/// Everything an adapter may use while provisioning.
pub struct RemoteContext<'a> {
    pub workspace: &'a Workspace,
    pub runner: &'a dyn CommandRunner,
}

pub trait HostingAdapter {
    fn provider(&self) -> Provider;

    fn wiring(&self) -> RemoteWiring;

    /// Repository name derived from the application name.
    fn remote_name(&self, app_name: &str) -> String {
        clean_app_name(app_name)
    }

    /// Provision the hosted repository and name the git remote that reaches it.
    fn create_remote(
        &self,
        ctx: &RemoteContext<'_>,
        name: &str,
        organization: Option<&str>,
    ) -> Result<ProvisionedRemote>;

    /// Commands that publish the local history once `remote` is wired.
    fn push_commands(&self, remote: &ProvisionedRemote, base_branch: &str) -> Vec<CommandSpec>;
}

/// Adapters enabled by `flags`, in their fixed order: Heroku, Bitbucket, GitHub.
pub fn select_adapters(flags: &FeatureFlags, settings: &Settings) -> Vec<Box<dyn HostingAdapter>> {
    let mut adapters: Vec<Box<dyn HostingAdapter>> = Vec::new();
    if flags.heroku {
        adapters.push(Box::new(HerokuAdapter));
    }
    if flags.bitbucket {
        adapters.push(Box::new(BitbucketAdapter::from_settings(&settings.bitbucket)));
    }
    if flags.github {
        adapters.push(Box::new(GithubAdapter));
    }
    adapters
}

/// First whitespace-separated token in `output` that starts with `prefix`.
fn find_url(output: &str, prefix: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|token| token.starts_with(prefix))
        .map(|token| token.trim_end_matches(['.', ',']).to_string())
}

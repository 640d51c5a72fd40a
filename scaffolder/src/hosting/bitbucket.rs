//! Bitbucket: provisioned over the REST API.
//!
//! The API returns clone links but does not touch the local repository, so the
//! orchestrator attaches the returned URL as `origin` itself.

use std::env;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{HostingAdapter, Provider, ProvisionedRemote, RemoteContext, RemoteWiring};
use crate::core::types::CommandSpec;
use crate::error::{PipelineError, Result};
use crate::io::config::BitbucketSettings;
use crate::io::git;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Remote the orchestrator attaches the clone URL under.
const REMOTE: &str = "origin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitbucketCredentials {
    pub username: String,
    pub app_password: String,
}

#[derive(Debug, Serialize)]
struct CreateRepository<'a> {
    scm: &'a str,
    name: &'a str,
    is_private: bool,
}

pub struct BitbucketAdapter {
    api_base: String,
    credentials: Option<BitbucketCredentials>,
    /// Env var names, kept for error messages when credentials are missing.
    username_env: String,
    password_env: String,
}

impl BitbucketAdapter {
    pub fn new(api_base: impl Into<String>, credentials: Option<BitbucketCredentials>) -> Self {
        let defaults = BitbucketSettings::default();
        Self {
            api_base: api_base.into(),
            credentials,
            username_env: defaults.username_env,
            password_env: defaults.password_env,
        }
    }

    /// Resolve credentials from the environment variables named in settings.
    pub fn from_settings(settings: &BitbucketSettings) -> Self {
        let credentials = match (
            env::var(&settings.username_env),
            env::var(&settings.password_env),
        ) {
            (Ok(username), Ok(app_password)) => Some(BitbucketCredentials {
                username,
                app_password,
            }),
            _ => None,
        };
        Self {
            username_env: settings.username_env.clone(),
            password_env: settings.password_env.clone(),
            ..Self::new(settings.api_base.clone(), credentials)
        }
    }

    fn failure(&self, reason: impl Into<String>) -> PipelineError {
        PipelineError::RemoteCreationFailure {
            provider: self.provider().to_string(),
            reason: reason.into(),
        }
    }

    fn endpoint(&self, workspace: &str, slug: &str) -> String {
        format!(
            "{}/repositories/{}/{}",
            self.api_base.trim_end_matches('/'),
            workspace,
            slug
        )
    }
}

impl HostingAdapter for BitbucketAdapter {
    fn provider(&self) -> Provider {
        Provider::Bitbucket
    }

    fn wiring(&self) -> RemoteWiring {
        RemoteWiring::AttachOrigin
    }

    #[instrument(skip_all, fields(name = %name))]
    fn create_remote(
        &self,
        _ctx: &RemoteContext<'_>,
        name: &str,
        organization: Option<&str>,
    ) -> Result<ProvisionedRemote> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            self.failure(format!(
                "credentials missing (set {} and {})",
                self.username_env, self.password_env
            ))
        })?;
        let owner = organization.unwrap_or(credentials.username.as_str());
        let url = self.endpoint(owner, &name.to_lowercase());
        debug!(%url, "creating bitbucket repository");

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| self.failure(format!("build http client: {err}")))?;
        let response = client
            .post(&url)
            .basic_auth(&credentials.username, Some(&credentials.app_password))
            .json(&CreateRepository {
                scm: "git",
                name,
                is_private: true,
            })
            .send()
            .map_err(|err| self.failure(format!("HTTP request failed: {err}")))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| self.failure(format!("read response: {err}")))?;
        if !status.is_success() {
            return Err(self.failure(format!(
                "API error: HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|err| self.failure(format!("parse response: {err}")))?;
        let clone_url = clone_url(&json);
        info!(url = ?clone_url, "bitbucket repository created");
        Ok(ProvisionedRemote::new(REMOTE, clone_url))
    }

    fn push_commands(&self, remote: &ProvisionedRemote, _base_branch: &str) -> Vec<CommandSpec> {
        vec![git::push_all_with_upstream(&remote.git_remote)]
    }
}

/// Pick the ssh clone link, falling back to https.
fn clone_url(response: &Value) -> Option<String> {
    let links = response.pointer("/links/clone")?.as_array()?;
    let href = |kind: &str| {
        links
            .iter()
            .find(|link| link.get("name").and_then(Value::as_str) == Some(kind))
            .and_then(|link| link.get("href"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    href("ssh").or_else(|| href("https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::runner::{CommandResult, CommandRunner};
    use crate::io::workspace::Workspace;
    use serde_json::json;

    struct NoopRunner;

    impl CommandRunner for NoopRunner {
        fn run(&self, _ws: &Workspace, _program: &str, _args: &[String]) -> CommandResult {
            CommandResult::success("")
        }
    }

    #[test]
    fn prefers_ssh_clone_link() {
        let response = json!({
            "links": {
                "clone": [
                    {"name": "https", "href": "https://bitbucket.org/acme/blog_app.git"},
                    {"name": "ssh", "href": "git@bitbucket.org:acme/blog_app.git"}
                ]
            }
        });
        assert_eq!(
            clone_url(&response),
            Some("git@bitbucket.org:acme/blog_app.git".to_string())
        );
    }

    #[test]
    fn falls_back_to_https_and_tolerates_missing_links() {
        let response = json!({
            "links": {"clone": [{"name": "https", "href": "https://bitbucket.org/a/b.git"}]}
        });
        assert_eq!(
            clone_url(&response),
            Some("https://bitbucket.org/a/b.git".to_string())
        );
        assert_eq!(clone_url(&json!({})), None);
    }

    #[test]
    fn endpoint_joins_workspace_and_slug() {
        let adapter = BitbucketAdapter::new("https://api.bitbucket.org/2.0/", None);
        assert_eq!(
            adapter.endpoint("acme", "blog_app"),
            "https://api.bitbucket.org/2.0/repositories/acme/blog_app"
        );
    }

    #[test]
    fn missing_credentials_fail_without_network() {
        let adapter = BitbucketAdapter::new("http://127.0.0.1:9", None);
        let ws = Workspace::new(".");
        let ctx = RemoteContext {
            workspace: &ws,
            runner: &NoopRunner,
        };
        let err = adapter.create_remote(&ctx, "blog_app", None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RemoteCreationFailure { ref provider, .. } if provider == "bitbucket"
        ));
    }
}

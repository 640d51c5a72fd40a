//! Pipeline configuration.
//!
//! [`Configuration`] is the per-run record (app name, organization, database
//! credentials, hosting flags) built once from the CLI. [`Settings`] holds the
//! tunable pipeline knobs read from `scaffolder.toml`. Both are read-only once
//! the pipeline starts.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::FailurePolicy;

/// Default settings file name, resolved against the project root.
pub const SETTINGS_FILE: &str = "scaffolder.toml";

/// Database credentials. Absent values mean placeholder credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Optional hosting integrations. Independent; all three may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    pub heroku: bool,
    pub bitbucket: bool,
    pub github: bool,
}

impl FeatureFlags {
    pub fn any(&self) -> bool {
        self.heroku || self.bitbucket || self.github
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub app_name: String,
    pub organization: Option<String>,
    pub database: DatabaseCredentials,
    pub features: FeatureFlags,
}

impl Configuration {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            organization: None,
            database: DatabaseCredentials::default(),
            features: FeatureFlags::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(anyhow!("application name must not be empty"));
        }
        if self
            .organization
            .as_deref()
            .is_some_and(|org| org.trim().is_empty())
        {
            return Err(anyhow!("organization must not be blank when given"));
        }
        Ok(())
    }
}

/// Pipeline settings (TOML).
///
/// Missing fields default to the values the generated project expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Ruby version pinned in `.ruby-version`, the Gemfile and the README.
    pub ruby_version: String,

    /// Long-lived branch created at the end of the pipeline.
    pub develop_branch: String,

    /// Dependency install command run at the start of every checkpoint.
    pub install_command: Vec<String>,

    /// What a failed checkpoint sub-command does to the run.
    pub checkpoint_failure_policy: FailurePolicy,

    /// Per-command wall-clock limit. Unset means wait for the process to exit.
    pub command_timeout_secs: Option<u64>,

    /// Truncate captured stdout/stderr beyond this many bytes per stream.
    pub output_limit_bytes: usize,

    pub bitbucket: BitbucketSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BitbucketSettings {
    pub api_base: String,
    /// Env var holding the account username.
    pub username_env: String,
    /// Env var holding the app password.
    pub password_env: String,
}

impl Default for BitbucketSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.bitbucket.org/2.0".to_string(),
            username_env: "BITBUCKET_USERNAME".to_string(),
            password_env: "BITBUCKET_APP_PASSWORD".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ruby_version: "2.2.2".to_string(),
            develop_branch: "develop".to_string(),
            install_command: vec!["bundle".to_string(), "install".to_string()],
            checkpoint_failure_policy: FailurePolicy::WarnAndContinue,
            command_timeout_secs: None,
            output_limit_bytes: 100_000,
            bitbucket: BitbucketSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.ruby_version.trim().is_empty() {
            return Err(anyhow!("ruby_version must not be empty"));
        }
        if self.develop_branch.trim().is_empty() {
            return Err(anyhow!("develop_branch must not be empty"));
        }
        if self.install_command.is_empty() || self.install_command[0].trim().is_empty() {
            return Err(anyhow!("install_command must be a non-empty array"));
        }
        if self.command_timeout_secs == Some(0) {
            return Err(anyhow!("command_timeout_secs must be > 0 when set"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.bitbucket.api_base.trim().is_empty() {
            return Err(anyhow!("bitbucket.api_base must not be empty"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Load settings from a TOML file.
///
/// If the file is missing, returns `Settings::default()`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let settings: Settings =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings = load_settings(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            "ruby_version = \"3.3.0\"\ncheckpoint_failure_policy = \"abort\"\n\n[bitbucket]\nusername_env = \"BB_USER\"\n",
        )
        .expect("write");
        let settings = load_settings(&path).expect("load");
        assert_eq!(settings.ruby_version, "3.3.0");
        assert_eq!(
            settings.checkpoint_failure_policy,
            FailurePolicy::AbortOnFailure
        );
        assert_eq!(settings.develop_branch, "develop");
        assert_eq!(settings.bitbucket.username_env, "BB_USER");
        assert_eq!(settings.bitbucket.password_env, "BITBUCKET_APP_PASSWORD");
        assert_eq!(settings.command_timeout(), None);
    }

    #[test]
    fn rejects_empty_install_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(SETTINGS_FILE);
        fs::write(&path, "install_command = []\n").expect("write");
        let err = load_settings(&path).unwrap_err();
        assert!(err.to_string().contains("install_command"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let settings = Settings {
            command_timeout_secs: Some(0),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn configuration_requires_app_name() {
        assert!(Configuration::new("  ").validate().is_err());
        assert!(Configuration::new("blog-app").validate().is_ok());
    }
}

//! Test-only helpers: a recording command runner, a Rails skeleton fixture and
//! a scripted hosting adapter.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::CommandSpec;
use crate::error::{PipelineError, Result as PipelineResult};
use crate::hosting::{HostingAdapter, Provider, ProvisionedRemote, RemoteContext, RemoteWiring};
use crate::io::git;
use crate::io::runner::{CommandResult, CommandRunner};
use crate::io::workspace::Workspace;

type Effect = Box<dyn Fn(&Path)>;

/// Command runner that records every invocation as a single line
/// (`program arg1 arg2`) and answers from a script keyed by line prefix.
///
/// Git remotes are tracked like a real repository: `git remote add` and
/// `gh repo create --remote` register a name, `git remote get-url` answers
/// from the registered names, and both refuse a name that is already taken.
#[derive(Default)]
pub struct RecordingRunner {
    seen: RefCell<Vec<String>>,
    remotes: RefCell<Vec<(String, String)>>,
    failures: Vec<String>,
    outputs: Vec<(String, String)>,
    effects: Vec<(String, Effect)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner that behaves like a working Rails toolchain: the rspec generator
    /// writes its bootstrap files and HEAD is on `main`.
    pub fn rails() -> Self {
        Self::new()
            .output_for("git symbolic-ref", "main\n")
            .on("bundle exec rails generate rspec:install", |root| {
                write_file(&root.join("spec/spec_helper.rb"), SPEC_HELPER);
                write_file(&root.join("spec/rails_helper.rb"), RAILS_HELPER);
            })
    }

    /// Every command whose line starts with `prefix` fails.
    pub fn fail_on(mut self, prefix: &str) -> Self {
        self.failures.push(prefix.to_string());
        self
    }

    /// Successful commands starting with `prefix` print `output`.
    pub fn output_for(mut self, prefix: &str, output: &str) -> Self {
        self.outputs.push((prefix.to_string(), output.to_string()));
        self
    }

    /// Run `effect` against the workspace root when a command starts with `prefix`.
    pub fn on(mut self, prefix: &str, effect: impl Fn(&Path) + 'static) -> Self {
        self.effects.push((prefix.to_string(), Box::new(effect)));
        self
    }

    pub fn invocations(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }

    fn remote_url(&self, name: &str) -> Option<String> {
        self.remotes
            .borrow()
            .iter()
            .find(|(remote, _)| remote == name)
            .map(|(_, url)| url.clone())
    }

    fn track_remotes(&self, program: &str, args: &[String]) -> Option<CommandResult> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let (name, url) = match (program, args.as_slice()) {
            ("git", ["remote", "get-url", name]) => {
                return Some(match self.remote_url(name) {
                    Some(url) => CommandResult::success(format!("{url}\n")),
                    None => {
                        CommandResult::failure(Some(2), format!("error: No such remote '{name}'"))
                    }
                });
            }
            ("git", ["remote", "add", name, url]) => (*name, (*url).to_string()),
            ("gh", ["repo", "create", repo, .., "--remote", name]) => {
                (*name, format!("https://github.com/{repo}.git"))
            }
            _ => return None,
        };
        if self.remote_url(name).is_some() {
            return Some(CommandResult::failure(
                Some(3),
                format!("error: remote {name} already exists."),
            ));
        }
        self.remotes.borrow_mut().push((name.to_string(), url));
        None
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.seen
            .borrow()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, workspace: &Workspace, program: &str, args: &[String]) -> CommandResult {
        let line = std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        self.seen.borrow_mut().push(line.clone());

        if self.failures.iter().any(|prefix| line.starts_with(prefix)) {
            return CommandResult::failure(Some(1), format!("scripted failure: {line}"));
        }
        if let Some(result) = self.track_remotes(program, args) {
            return result;
        }
        for (prefix, effect) in &self.effects {
            if line.starts_with(prefix) {
                effect(workspace.root());
            }
        }
        let output = self
            .outputs
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        CommandResult::success(output)
    }
}

/// A fresh Rails application skeleton in a temp directory.
pub struct TestSkeleton {
    temp: TempDir,
}

impl TestSkeleton {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        for (path, contents) in SKELETON_FILES {
            let target = temp.path().join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
            fs::write(&target, contents).with_context(|| format!("write {}", target.display()))?;
        }
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.temp.path())
    }

    pub fn file(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.file(relative);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}

/// Calls observed by a [`FakeAdapter`]: `(name, organization)`.
pub type AdapterCalls = Rc<RefCell<Vec<(String, Option<String>)>>>;

/// Hosting adapter with a scripted creation result.
pub struct FakeAdapter {
    provider: Provider,
    wiring: RemoteWiring,
    result: std::result::Result<Option<String>, String>,
    calls: AdapterCalls,
}

impl FakeAdapter {
    pub fn new(
        provider: Provider,
        wiring: RemoteWiring,
        result: std::result::Result<Option<String>, String>,
    ) -> Self {
        Self {
            provider,
            wiring,
            result,
            calls: AdapterCalls::default(),
        }
    }

    /// Shared handle to the recorded calls, readable after the adapter is boxed.
    pub fn calls(&self) -> AdapterCalls {
        Rc::clone(&self.calls)
    }
}

impl HostingAdapter for FakeAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn wiring(&self) -> RemoteWiring {
        self.wiring
    }

    fn create_remote(
        &self,
        _ctx: &RemoteContext<'_>,
        name: &str,
        organization: Option<&str>,
    ) -> PipelineResult<ProvisionedRemote> {
        self.calls
            .borrow_mut()
            .push((name.to_string(), organization.map(str::to_string)));
        let git_remote = match self.wiring {
            RemoteWiring::AttachOrigin => "origin",
            RemoteWiring::SelfWired => "fake",
        };
        self.result
            .clone()
            .map(|url| ProvisionedRemote::new(git_remote, url))
            .map_err(|reason| PipelineError::RemoteCreationFailure {
                provider: self.provider.to_string(),
                reason,
            })
    }

    fn push_commands(&self, remote: &ProvisionedRemote, base_branch: &str) -> Vec<CommandSpec> {
        match self.wiring {
            RemoteWiring::AttachOrigin => vec![git::push_all_with_upstream(&remote.git_remote)],
            RemoteWiring::SelfWired => vec![git::push_branch(&remote.git_remote, base_branch)],
        }
    }
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write file");
}

const SKELETON_FILES: &[(&str, &str)] = &[
    (
        ".gitignore",
        "# Ignore bundler config.\n/.bundle\n\n/db/*.sqlite3\n/log/*\n!/log/.keep\n/tmp\n",
    ),
    ("Gemfile", GEMFILE),
    ("README.rdoc", "== README\n\nThis README would normally document whatever steps are necessary.\n"),
    ("app/views/layouts/application.html.erb", LAYOUT),
    (
        "app/assets/javascripts/application.js",
        "//= require jquery\n//= require jquery_ujs\n//= require turbolinks\n//= require_tree .\n",
    ),
    (
        "config/database.yml",
        "default: &default\n  adapter: sqlite3\n  pool: 5\n\ndevelopment:\n  <<: *default\n  database: db/development.sqlite3\n",
    ),
    ("config/environment.rb", ENVIRONMENT),
    (
        "config/routes.rb",
        "Rails.application.routes.draw do\n  # The priority is based upon order of creation.\nend\n",
    ),
    (
        "test/test_helper.rb",
        "ENV['RAILS_ENV'] ||= 'test'\nrequire File.expand_path('../../config/environment', __FILE__)\n",
    ),
];

const GEMFILE: &str = "source 'https://rubygems.org'


# Bundle edge Rails instead: gem 'rails', github: 'rails/rails'
gem 'rails', '4.2.1'
# Use sqlite3 as the database for Active Record
gem 'sqlite3'
# Use SCSS for stylesheets
gem 'sass-rails', '~> 5.0'
# Turbolinks makes following links in your web application faster.
gem 'turbolinks'

group :development, :test do
  gem 'byebug'
  gem 'spring'
end
";

const LAYOUT: &str = "<!DOCTYPE html>
<html>
<head>
  <title>Blog</title>
  <%= stylesheet_link_tag    'application', media: 'all', 'data-turbolinks-track' => true %>
  <%= javascript_include_tag 'application', 'data-turbolinks-track' => true %>
  <%= csrf_meta_tags %>
</head>
<body>

<%= yield %>

</body>
</html>
";

const ENVIRONMENT: &str = "# Load the Rails application.
require File.expand_path('../application', __FILE__)

# Initialize the Rails application.
Rails.application.initialize!
";

const SPEC_HELPER: &str = "RSpec.configure do |config|
end
";

const RAILS_HELPER: &str = r##"# This file is copied to spec/ when you run 'rails generate rspec:install'
ENV['RAILS_ENV'] ||= 'test'
require File.expand_path('../../config/environment', __FILE__)
require 'spec_helper'
require 'rspec/rails'
# Add additional requires below this line. Rails is not loaded until this point!

# Requires supporting ruby files with custom matchers and macros, etc, in
# spec/support/ and its subdirectories.
#
# Dir[Rails.root.join("spec/support/**/*.rb")].each { |f| require f }

# Checks for pending migrations before tests are run.
ActiveRecord::Migration.maintain_test_schema!

RSpec.configure do |config|
  config.fixture_path = "#{::Rails.root}/spec/fixtures"

  config.use_transactional_fixtures = true

  config.infer_spec_type_from_file_location!
end
"##;

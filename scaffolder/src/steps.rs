//! The fixed, ordered step table.
//!
//! Steps are built once from the configuration and are plain data: every
//! file body is rendered up front, so running the table needs only the
//! mutator, the command runner and the checkpoint manager.

use crate::core::manifest::{Gem, GemfileEditor};
use crate::core::names::database_base_name;
use crate::core::types::{CommandSpec, FailurePolicy, Mutation, Pattern, Step};
use crate::error::Result;
use crate::io::config::{Configuration, Settings};
use crate::io::git;
use crate::io::templates::Templates;

/// Project-relative paths touched by the pipeline.
pub mod paths {
    pub const GITIGNORE: &str = ".gitignore";
    pub const RUBY_VERSION: &str = ".ruby-version";
    pub const LAYOUT: &str = "app/views/layouts/application.html.erb";
    pub const APPLICATION_JS: &str = "app/assets/javascripts/application.js";
    pub const DATABASE_YML: &str = "config/database.yml";
    pub const DATABASE_SAMPLE_YML: &str = "config/database.sample.yml";
    pub const README_RDOC: &str = "README.rdoc";
    pub const README_MD: &str = "README.md";
    pub const SECRETS_SAMPLE: &str = "config/app_environment_variables.sample.rb";
    pub const SECRETS_LOCAL: &str = "config/app_environment_variables.rb";
    pub const ENVIRONMENT_RB: &str = "config/environment.rb";
    pub const TEST_DIR: &str = "test";
    pub const RAILS_HELPER: &str = "spec/rails_helper.rb";
    pub const SPEC_SUPPORT_DIRS: [&str; 4] = ["support", "models", "features", "factories"];
    pub const ROUTES: &str = "config/routes.rb";
    pub const HOME_CONTROLLER: &str = "app/controllers/home_controller.rb";
    pub const HOME_VIEW: &str = "app/views/home/index.html.erb";
}

/// Credentials written to the sample database config, whatever was configured.
pub const PLACEHOLDER_USERNAME: &str = "username";
pub const PLACEHOLDER_PASSWORD: &str = "pass";

const ENVIRONMENT_ANCHOR: &str = "require File.expand_path('../application', __FILE__)\n";
const RAILS_HELPER_REQUIRES_ANCHOR: &str =
    "# Add additional requires below this line. Rails is not loaded until this point!\n";
const RAILS_HELPER_CONFIG_ANCHOR: &str = "config.infer_spec_type_from_file_location!\n";
const SUPPORT_AUTOLOAD: &str = "Dir[Rails.root.join(\"spec/support/**/*.rb\")].each { |f| require f }";
const ROUTES_ANCHOR: &str = "Rails.application.routes.draw do\n";
const HOME_ROUTE: &str = "  root to: 'home#index'\n";

/// Build the canonical step sequence.
pub fn build_steps(
    config: &Configuration,
    settings: &Settings,
    templates: &Templates,
) -> Result<Vec<Step>> {
    let gemfile = GemfileEditor::default();
    let app = config.app_name.as_str();
    let ruby = settings.ruby_version.as_str();

    let ignore = Step::new("normalize ignore file")
        .mutate(Mutation::append(
            paths::GITIGNORE,
            templates.literal("gitignore_entries")?,
        ))
        .checkpoint("Initial commit with updated .gitignore");

    let dependencies = Step::new("pin runtime and dependencies")
        .mutate(Mutation::create(
            paths::RUBY_VERSION,
            templates.render("ruby_version", minijinja::context! { ruby_version => ruby })?,
        ))
        .mutate(gemfile.strip_comments())
        .mutate(gemfile.collapse_blank_lines())
        .mutate(gemfile.remove_gem("sqlite3"))
        .mutate(gemfile.add_gem(&Gem::new("pg")))
        .mutate(gemfile.add_gem(&Gem::new("rails_12factor").group("production")))
        .mutate(gemfile.add_group(&["development", "test"], &development_gems()))
        .mutate(gemfile.pin_ruby(ruby))
        .checkpoint("add gems");

    let turbolinks = Step::new("remove turbolinks")
        .mutate(gemfile.remove_gem("turbolinks"))
        .mutate(Mutation::substitute(
            paths::LAYOUT,
            Pattern::regex(r#", ('|")data-turbolinks-track('|") => true"#),
            "",
        ))
        .mutate(Mutation::substitute(
            paths::APPLICATION_JS,
            Pattern::regex(r"//= require turbolinks[\r\n]"),
            "",
        ))
        .checkpoint("remove turbolinks");

    let database = database_base_name(app);
    let username = config
        .database
        .username
        .as_deref()
        .unwrap_or(PLACEHOLDER_USERNAME);
    let password = config
        .database
        .password
        .as_deref()
        .unwrap_or(PLACEHOLDER_PASSWORD);
    let database_config = Step::new("generate database config")
        .mutate(Mutation::remove(paths::DATABASE_YML))
        .mutate(Mutation::create(
            paths::DATABASE_SAMPLE_YML,
            templates.database_yml(&database, PLACEHOLDER_USERNAME, PLACEHOLDER_PASSWORD)?,
        ))
        .mutate(Mutation::create(
            paths::DATABASE_YML,
            templates.database_yml(&database, username, password)?,
        ))
        .checkpoint("add database.sample.yml and database.yml files");

    let readme = Step::new("generate readme")
        .mutate(Mutation::remove(paths::README_RDOC))
        .mutate(Mutation::create(paths::README_MD, templates.readme(app, ruby)?))
        .checkpoint("add readme");

    let secrets_body = templates.literal("app_environment_variables.sample.rb")?;
    let secrets = Step::new("generate secrets sample")
        .mutate(Mutation::create(paths::SECRETS_SAMPLE, secrets_body.clone()))
        .mutate(Mutation::create(paths::SECRETS_LOCAL, secrets_body))
        .mutate(Mutation::insert_after(
            paths::ENVIRONMENT_RB,
            ENVIRONMENT_ANCHOR,
            templates.literal("environment_loader.rb")?,
        ))
        .checkpoint("add app environment variable sample file");

    let install_rspec = Step::new("install test framework")
        .run(install_command(settings, FailurePolicy::AbortOnFailure))
        .run(CommandSpec::abort(
            "bundle",
            ["exec", "rails", "generate", "rspec:install"],
        ))
        .mutate(Mutation::remove(paths::TEST_DIR))
        .checkpoint("install rspec");

    let customize_rspec = Step::new("customize test bootstrap")
        .mutate_all(
            paths::SPEC_SUPPORT_DIRS
                .iter()
                .map(|dir| Mutation::create(format!("spec/{dir}/.keep"), "")),
        )
        .mutate(Mutation::insert_after(
            paths::RAILS_HELPER,
            RAILS_HELPER_REQUIRES_ANCHOR,
            templates.literal("rails_helper_requires.rb")?,
        ))
        .mutate(Mutation::substitute(
            paths::RAILS_HELPER,
            Pattern::literal(format!("# {SUPPORT_AUTOLOAD}")),
            SUPPORT_AUTOLOAD,
        ))
        .mutate(Mutation::substitute(
            paths::RAILS_HELPER,
            Pattern::literal("config.use_transactional_fixtures = true"),
            "config.use_transactional_fixtures = false",
        ))
        .mutate(Mutation::insert_after(
            paths::RAILS_HELPER,
            RAILS_HELPER_CONFIG_ANCHOR,
            templates.literal("rails_helper_database_cleaner.rb")?,
        ))
        .checkpoint("customize rspec for basic usage");

    let homepage = Step::new("wire homepage")
        .mutate(Mutation::insert_after(paths::ROUTES, ROUTES_ANCHOR, HOME_ROUTE))
        .mutate(Mutation::create(
            paths::HOME_CONTROLLER,
            templates.literal("home_controller.rb")?,
        ))
        .mutate(Mutation::create(
            paths::HOME_VIEW,
            templates.render("home_index.html.erb", minijinja::context! { app_name => app })?,
        ))
        .checkpoint("add homepage");

    // Committed together with the guard files in the next step.
    let binstubs = Step::new("regenerate binstubs")
        .run(install_command(settings, FailurePolicy::WarnAndContinue))
        .run(CommandSpec::warn(
            "bundle",
            ["exec", "spring", "binstub", "--all"],
        ));

    let guard = Step::new("initialize guard")
        .run(CommandSpec::warn(
            "bundle",
            ["exec", "guard", "init", "guard-bundler", "guard-rspec"],
        ))
        .checkpoint("springify app and add guard files");

    let mut local_database = Step::new("create local database");
    if config.database.username.is_some() {
        local_database =
            local_database.run(CommandSpec::warn("rake", ["db:create", "db:migrate"]));
    }

    let develop = Step::new("create develop branch")
        .run(git::checkout_new_branch(&settings.develop_branch));

    Ok(vec![
        ignore,
        dependencies,
        turbolinks,
        database_config,
        readme,
        secrets,
        install_rspec,
        customize_rspec,
        homepage,
        binstubs,
        guard,
        local_database,
        develop,
    ])
}

/// Human-readable table: one line per step with its action counts and checkpoint.
pub fn render_plan(steps: &[Step]) -> String {
    let mut out = String::new();
    for (index, step) in steps.iter().enumerate() {
        let checkpoint = step
            .checkpoint
            .as_deref()
            .map(|message| format!("commit {message:?}"))
            .unwrap_or_else(|| "no checkpoint".to_string());
        out.push_str(&format!(
            "{:>2}. {} (mutations={} commands={}) -> {}\n",
            index + 1,
            step.name,
            step.mutation_count(),
            step.command_count(),
            checkpoint
        ));
    }
    out
}

fn install_command(settings: &Settings, policy: FailurePolicy) -> CommandSpec {
    CommandSpec::from_argv(&settings.install_command, policy).unwrap_or_else(|| CommandSpec {
        program: "bundle".to_string(),
        args: vec!["install".to_string()],
        policy,
    })
}

fn development_gems() -> Vec<Gem> {
    vec![
        Gem::new("awesome_print"),
        Gem::new("capybara"),
        Gem::new("database_cleaner"),
        Gem::new("factory_girl_rails"),
        Gem::new("faker"),
        Gem::new("guard"),
        Gem::new("guard-bundler").no_require(),
        Gem::new("guard-rspec").no_require(),
        Gem::new("poltergeist"),
        Gem::new("pry"),
        Gem::new("rb-inotify").no_require(),
        Gem::new("rb-fsevent").no_require(),
        Gem::new("rb-fchange").no_require(),
        Gem::new("rspec-rails"),
        Gem::new("rspec-collection_matchers"),
        Gem::new("shoulda-matchers"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Action, MutationKind};

    fn table(config: &Configuration) -> Vec<Step> {
        let templates = Templates::new().expect("templates");
        build_steps(config, &Settings::default(), &templates).expect("steps")
    }

    fn created_content<'a>(steps: &'a [Step], path: &str) -> &'a str {
        steps
            .iter()
            .flat_map(|step| &step.actions)
            .find_map(|action| match action {
                Action::Mutate(Mutation {
                    path: target,
                    kind: MutationKind::Create { content },
                }) if target.as_os_str() == path => Some(content.as_str()),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no create for {path}"))
    }

    #[test]
    fn sequence_is_fixed() {
        let names: Vec<_> = table(&Configuration::new("blog-app"))
            .into_iter()
            .map(|step| step.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "normalize ignore file",
                "pin runtime and dependencies",
                "remove turbolinks",
                "generate database config",
                "generate readme",
                "generate secrets sample",
                "install test framework",
                "customize test bootstrap",
                "wire homepage",
                "regenerate binstubs",
                "initialize guard",
                "create local database",
                "create develop branch",
            ]
        );
    }

    #[test]
    fn ten_steps_checkpoint() {
        let steps = table(&Configuration::new("blog-app"));
        let checkpoints: Vec<_> = steps
            .iter()
            .filter_map(|step| step.checkpoint.as_deref())
            .collect();
        assert_eq!(checkpoints.len(), 10);
        assert_eq!(checkpoints[0], "Initial commit with updated .gitignore");
        assert!(steps[9].checkpoint.is_none(), "binstubs fold into guard commit");
        assert!(steps[11].checkpoint.is_none());
        assert!(steps[12].checkpoint.is_none());
    }

    #[test]
    fn database_names_derive_from_app_name() {
        let mut config = Configuration::new("blog-app");
        config.database.username = Some("alice".to_string());
        config.database.password = Some("s3cret".to_string());
        let steps = table(&config);

        let real = created_content(&steps, paths::DATABASE_YML);
        assert!(real.contains("database: blog_app_dev"));
        assert!(real.contains("database: blog_app_test"));
        assert!(real.contains("database: blog_app_prod"));
        assert!(real.contains("username: 'alice'"));

        let sample = created_content(&steps, paths::DATABASE_SAMPLE_YML);
        assert!(sample.contains("username: 'username'\n"));
        assert!(sample.contains("password: 'pass'\n"));
        assert!(!sample.contains("alice"));
    }

    #[test]
    fn local_database_only_with_username() {
        let without = table(&Configuration::new("blog-app"));
        assert!(without[11].actions.is_empty());

        let mut config = Configuration::new("blog-app");
        config.database.username = Some("alice".to_string());
        let with = table(&config);
        assert_eq!(
            with[11].actions,
            vec![Action::Run(CommandSpec::warn("rake", ["db:create", "db:migrate"]))]
        );
    }

    #[test]
    fn generator_commands_abort_on_failure() {
        let steps = table(&Configuration::new("blog-app"));
        let policies: Vec<_> = steps[6]
            .actions
            .iter()
            .filter_map(|action| match action {
                Action::Run(cmd) => Some(cmd.policy),
                Action::Mutate(_) => None,
            })
            .collect();
        assert_eq!(
            policies,
            vec![FailurePolicy::AbortOnFailure, FailurePolicy::AbortOnFailure]
        );
    }

    #[test]
    fn plan_lists_every_step() {
        let steps = table(&Configuration::new("blog-app"));
        let plan = render_plan(&steps);
        assert_eq!(plan.lines().count(), steps.len());
        assert!(plan.starts_with(" 1. normalize ignore file (mutations=1 commands=0) -> commit"));
        assert!(plan.contains("13. create develop branch (mutations=0 commands=1) -> no checkpoint"));
    }

    #[test]
    fn readme_mentions_app_and_version() {
        let steps = table(&Configuration::new("blog-app"));
        let readme = created_content(&steps, paths::README_MD);
        assert!(readme.starts_with("# blog-app\n"));
        assert!(readme.contains("rvm use 2.2.2"));
    }
}

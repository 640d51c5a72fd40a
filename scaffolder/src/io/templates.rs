//! Literal file bodies rendered from template assets.
//!
//! Large payloads live under `templates/` and are compiled into the binary.
//! Rendering is strict: a template that references an unknown variable fails
//! instead of silently producing an empty string.

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value, context};

use crate::error::{PipelineError, Result};

const TEMPLATES: &[(&str, &str)] = &[
    (
        "gitignore_entries",
        include_str!("../../templates/gitignore_entries.j2"),
    ),
    ("ruby_version", include_str!("../../templates/ruby_version.j2")),
    ("database.yml", include_str!("../../templates/database.yml.j2")),
    ("README.md", include_str!("../../templates/README.md.j2")),
    (
        "app_environment_variables.sample.rb",
        include_str!("../../templates/app_environment_variables.sample.rb.j2"),
    ),
    (
        "environment_loader.rb",
        include_str!("../../templates/environment_loader.rb.j2"),
    ),
    (
        "rails_helper_requires.rb",
        include_str!("../../templates/rails_helper_requires.rb.j2"),
    ),
    (
        "rails_helper_database_cleaner.rb",
        include_str!("../../templates/rails_helper_database_cleaner.rb.j2"),
    ),
    (
        "home_controller.rb",
        include_str!("../../templates/home_controller.rb.j2"),
    ),
    (
        "home_index.html.erb",
        include_str!("../../templates/home_index.html.erb.j2"),
    ),
];

/// Template engine wrapper around minijinja.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("yaml_quote", yaml_quote);
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|err| template_error(name, err))?;
        }
        Ok(Self { env })
    }

    /// Render a named template.
    pub fn render(&self, name: &str, ctx: Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|source| template_error(name, source))
    }

    /// Render a template that takes no variables.
    pub fn literal(&self, name: &str) -> Result<String> {
        self.render(name, context! {})
    }

    pub fn database_yml(&self, database: &str, username: &str, password: &str) -> Result<String> {
        self.render(
            "database.yml",
            context! { database => database, username => username, password => password },
        )
    }

    pub fn readme(&self, app_name: &str, ruby_version: &str) -> Result<String> {
        self.render(
            "README.md",
            context! { app_name => app_name, ruby_version => ruby_version },
        )
    }
}

/// Single-quoted YAML scalar. Only `'` needs escaping, by doubling it.
fn yaml_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn template_error(name: &str, source: minijinja::Error) -> PipelineError {
    PipelineError::Template {
        name: name.to_string(),
        source,
    }
}

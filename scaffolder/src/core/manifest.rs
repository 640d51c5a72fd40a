//! Gemfile editing expressed as mutation values.
//!
//! The editor never reads the manifest itself; it only describes the
//! mutations, so manifest edits sit in the step table next to every other
//! file operation.

use std::fmt::Write as _;
use std::path::PathBuf;

use super::types::{Mutation, Pattern};

pub const GEMFILE: &str = "Gemfile";
/// Line the pinned `ruby` directive is inserted after.
pub const SOURCE_LINE: &str = "source 'https://rubygems.org'\n";

/// A gem declaration with its trailing options (`group: :production`, `require: false`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gem {
    pub name: String,
    options: Vec<(String, String)>,
}

impl Gem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn group(mut self, group: &str) -> Self {
        self.options.push(("group".to_string(), format!(":{group}")));
        self
    }

    pub fn no_require(mut self) -> Self {
        self.options.push(("require".to_string(), "false".to_string()));
        self
    }

    fn render(&self) -> String {
        let mut line = format!("gem '{}'", self.name);
        for (key, value) in &self.options {
            let _ = write!(line, ", {key}: {value}");
        }
        line
    }
}

/// Describes edits to one dependency manifest.
#[derive(Debug, Clone)]
pub struct GemfileEditor {
    path: PathBuf,
}

impl Default for GemfileEditor {
    fn default() -> Self {
        Self::new(GEMFILE)
    }
}

impl GemfileEditor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Remove every match of `pattern`.
    pub fn remove_matching(&self, pattern: Pattern) -> Mutation {
        Mutation::substitute(&self.path, pattern, "")
    }

    /// Remove `# ...` comments through the end of their line.
    pub fn strip_comments(&self) -> Mutation {
        self.remove_matching(Pattern::regex(r"# .*[\r\n]?"))
    }

    /// Collapse runs of blank lines into a single newline.
    pub fn collapse_blank_lines(&self) -> Mutation {
        Mutation::substitute(&self.path, Pattern::regex(r"\n{2,}"), "\n")
    }

    /// Remove the `gem '<name>'` line.
    pub fn remove_gem(&self, name: &str) -> Mutation {
        self.remove_matching(Pattern::regex(format!(
            r"gem '{}'[\r\n]",
            regex::escape(name)
        )))
    }

    pub fn add_gem(&self, gem: &Gem) -> Mutation {
        Mutation::append(&self.path, format!("{}\n", gem.render()))
    }

    /// Append a `group :a, :b do ... end` block.
    pub fn add_group(&self, groups: &[&str], gems: &[Gem]) -> Mutation {
        let names = groups
            .iter()
            .map(|group| format!(":{group}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut block = format!("group {names} do\n");
        for gem in gems {
            let _ = writeln!(block, "  {}", gem.render());
        }
        block.push_str("end\n");
        Mutation::append(&self.path, block)
    }

    pub fn pin_ruby(&self, version: &str) -> Mutation {
        Mutation::insert_after(&self.path, SOURCE_LINE, format!("ruby '{version}'\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MutationKind;

    #[test]
    fn gem_options_render_in_order() {
        let gem = Gem::new("guard-rspec").no_require();
        assert_eq!(gem.render(), "gem 'guard-rspec', require: false");
        let gem = Gem::new("rails_12factor").group("production");
        assert_eq!(gem.render(), "gem 'rails_12factor', group: :production");
    }

    #[test]
    fn group_block_indents_gems() {
        let editor = GemfileEditor::default();
        let mutation = editor.add_group(
            &["development", "test"],
            &[Gem::new("pry"), Gem::new("guard-bundler").no_require()],
        );
        assert_eq!(
            mutation.kind,
            MutationKind::Append {
                content: "group :development, :test do\n  gem 'pry'\n  gem 'guard-bundler', require: false\nend\n"
                    .to_string()
            }
        );
    }

    #[test]
    fn remove_gem_escapes_name() {
        let mutation = GemfileEditor::default().remove_gem("rb.x");
        match mutation.kind {
            MutationKind::Substitute { pattern, replacement } => {
                assert_eq!(pattern, Pattern::regex(r"gem 'rb\.x'[\r\n]"));
                assert!(replacement.is_empty());
            }
            other => panic!("unexpected mutation {other:?}"),
        }
    }

    #[test]
    fn comment_pattern_strips_whole_line() {
        let mutation = GemfileEditor::default().strip_comments();
        let MutationKind::Substitute { pattern, .. } = mutation.kind else {
            panic!("expected substitute");
        };
        let re = pattern.compile().expect("compile");
        let out = re.replace_all("gem 'a'\n# note\ngem 'b'\n", "");
        assert_eq!(out, "gem 'a'\ngem 'b'\n");
    }
}

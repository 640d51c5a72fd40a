//! Value types describing pipeline work.
//!
//! A [`Step`] is pure data: a name, the ordered [`Action`]s it issues and an
//! optional checkpoint message. Nothing here touches the filesystem; the
//! mutator and command runner interpret these values.

use std::fmt;
use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Pattern used by [`MutationKind::Substitute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matched verbatim.
    Literal(String),
    /// Regular expression (`regex` crate syntax).
    Regex(String),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn regex(expr: impl Into<String>) -> Self {
        Self::Regex(expr.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(text) | Self::Regex(text) => text,
        }
    }

    pub fn compile(&self) -> Result<Regex> {
        let expr = match self {
            Self::Literal(text) => regex::escape(text),
            Self::Regex(expr) => expr.clone(),
        };
        Regex::new(&expr).map_err(|source| PipelineError::InvalidPattern {
            pattern: self.as_str().to_string(),
            source,
        })
    }
}

/// Operation kind and payload for one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Create { content: String },
    Append { content: String },
    InsertAfterAnchor { anchor: String, content: String },
    Substitute { pattern: Pattern, replacement: String },
    Remove,
}

impl MutationKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Append { .. } => "append",
            Self::InsertAfterAnchor { .. } => "insert-after-anchor",
            Self::Substitute { .. } => "substitute",
            Self::Remove => "remove",
        }
    }
}

/// One file operation applied to exactly one path (relative to the workspace root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub path: PathBuf,
    pub kind: MutationKind,
}

impl Mutation {
    pub fn create(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: MutationKind::Create {
                content: content.into(),
            },
        }
    }

    pub fn append(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: MutationKind::Append {
                content: content.into(),
            },
        }
    }

    pub fn insert_after(
        path: impl Into<PathBuf>,
        anchor: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: MutationKind::InsertAfterAnchor {
                anchor: anchor.into(),
                content: content.into(),
            },
        }
    }

    pub fn substitute(
        path: impl Into<PathBuf>,
        pattern: Pattern,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: MutationKind::Substitute {
                pattern,
                replacement: replacement.into(),
            },
        }
    }

    pub fn remove(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: MutationKind::Remove,
        }
    }
}

/// What the orchestrator does when an external command exits unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop the pipeline with `ProcessFailure`.
    #[serde(rename = "abort")]
    AbortOnFailure,
    /// Log, record in the report, keep going.
    #[serde(rename = "warn")]
    WarnAndContinue,
}

/// An external command plus the policy its call site chose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub policy: FailurePolicy,
}

impl CommandSpec {
    /// Command whose failure aborts the pipeline.
    pub fn abort<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            policy: FailurePolicy::AbortOnFailure,
        }
    }

    /// Command whose failure is logged and recorded only.
    pub fn warn<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy: FailurePolicy::WarnAndContinue,
            ..Self::abort(program, args)
        }
    }

    /// Build from an argv vector (first element is the program).
    pub fn from_argv(argv: &[String], policy: FailurePolicy) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            policy,
        })
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A single unit of work issued by a step, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Mutate(Mutation),
    Run(CommandSpec),
}

/// Named entry in the fixed pipeline sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub actions: Vec<Action>,
    /// Commit message for the checkpoint that follows the step, if any.
    pub checkpoint: Option<String>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            checkpoint: None,
        }
    }

    pub fn mutate(mut self, mutation: Mutation) -> Self {
        self.actions.push(Action::Mutate(mutation));
        self
    }

    pub fn mutate_all(mut self, mutations: impl IntoIterator<Item = Mutation>) -> Self {
        self.actions.extend(mutations.into_iter().map(Action::Mutate));
        self
    }

    pub fn run(mut self, command: CommandSpec) -> Self {
        self.actions.push(Action::Run(command));
        self
    }

    pub fn checkpoint(mut self, message: impl Into<String>) -> Self {
        self.checkpoint = Some(message.into());
        self
    }

    pub fn mutation_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| matches!(action, Action::Mutate(_)))
            .count()
    }

    pub fn command_count(&self) -> usize {
        self.actions.len() - self.mutation_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_escapes_metacharacters() {
        let re = Pattern::literal("Dir[Rails.root.join(\"x\")]").compile().expect("compile");
        assert!(re.is_match("# Dir[Rails.root.join(\"x\")] here"));
        assert!(!re.is_match("DirXRails"));
    }

    #[test]
    fn invalid_regex_reports_pattern() {
        let err = Pattern::regex("(").compile().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPattern { ref pattern, .. } if pattern == "("));
    }

    #[test]
    fn command_display_joins_args() {
        let cmd = CommandSpec::warn("git", ["add", "--all", "."]);
        assert_eq!(cmd.to_string(), "git add --all .");
        assert_eq!(cmd.policy, FailurePolicy::WarnAndContinue);
    }

    #[test]
    fn from_argv_rejects_empty() {
        assert!(CommandSpec::from_argv(&[], FailurePolicy::AbortOnFailure).is_none());
    }

    #[test]
    fn failure_policy_uses_short_names_in_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }
        let parsed: Wrapper = toml::from_str("policy = \"abort\"").expect("parse");
        assert_eq!(parsed.policy, FailurePolicy::AbortOnFailure);
    }

    #[test]
    fn step_counts_actions() {
        let step = Step::new("x")
            .mutate(Mutation::remove("a"))
            .run(CommandSpec::abort("true", Vec::<String>::new()))
            .mutate(Mutation::append("b", "c"));
        assert_eq!(step.mutation_count(), 2);
        assert_eq!(step.command_count(), 1);
    }
}

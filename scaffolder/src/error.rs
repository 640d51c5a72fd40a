//! Error taxonomy for pipeline components.
//!
//! Mutation errors (`PathConflict`, `NotFound`, `AnchorNotFound`) abort the
//! current step. `ProcessFailure` and `RemoteCreationFailure` are only raised
//! when the call site's policy asks for it; otherwise they are recorded in the
//! pipeline report and the run continues.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("refusing to create {}: path already exists", path.display())]
    PathConflict { path: PathBuf },

    #[error("cannot mutate {}: file not found", path.display())]
    NotFound { path: PathBuf },

    #[error("anchor {anchor:?} not found in {}", path.display())]
    AnchorNotFound { path: PathBuf, anchor: String },

    #[error("command `{command}` failed: {output}")]
    ProcessFailure { command: String, output: String },

    #[error("{provider} could not create remote repository: {reason}")]
    RemoteCreationFailure { provider: String, reason: String },

    #[error("step `{step}` failed")]
    StepFailed {
        step: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("invalid substitution pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("render template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// The underlying error, looking through step wrappers.
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True for errors that indicate the skeleton does not match the templates.
    pub fn is_mutation_error(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::PathConflict { .. } | Self::NotFound { .. } | Self::AnchorNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

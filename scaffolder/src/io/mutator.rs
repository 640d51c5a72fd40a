//! File Mutator: the primitive file operations every step is built from.
//!
//! Each primitive touches exactly one path, in place, without backups. Output is
//! a pure function of the inputs and the current file content.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::{debug, instrument};

use super::workspace::Workspace;
use crate::core::rewrite::{insert_after_first, substitute_all};
use crate::core::types::{Mutation, MutationKind, Pattern};
use crate::error::{PipelineError, Result};

/// Whether a primitive changed the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEffect {
    Changed,
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
pub struct FileMutator<'a> {
    workspace: &'a Workspace,
}

impl<'a> FileMutator<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    /// Apply one mutation invocation.
    #[instrument(skip_all, fields(op = mutation.kind.label(), path = %mutation.path.display()))]
    pub fn apply(&self, mutation: &Mutation) -> Result<MutationEffect> {
        let path = mutation.path.as_path();
        let effect = match &mutation.kind {
            MutationKind::Create { content } => self.create(path, content)?,
            MutationKind::Append { content } => self.append(path, content)?,
            MutationKind::InsertAfterAnchor { anchor, content } => {
                self.insert_after_anchor(path, anchor, content)?
            }
            MutationKind::Substitute {
                pattern,
                replacement,
            } => self.substitute_pattern(path, pattern, replacement)?,
            MutationKind::Remove => self.remove(path)?,
        };
        debug!(?effect, "mutation applied");
        Ok(effect)
    }

    /// Write a new file. Fails with `PathConflict` if anything exists at `path`.
    ///
    /// Missing parent directories are created.
    pub fn create(&self, path: &Path, content: &str) -> Result<MutationEffect> {
        let target = self.workspace.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| PipelineError::io("create directory", parent, err))?;
        }
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(PipelineError::PathConflict {
                    path: path.to_path_buf(),
                });
            }
            Err(err) => return Err(PipelineError::io("create", &target, err)),
        };
        file.write_all(content.as_bytes())
            .map_err(|err| PipelineError::io("write", &target, err))?;
        Ok(MutationEffect::Changed)
    }

    /// Append after the existing bytes. Fails with `NotFound` if the file is missing.
    pub fn append(&self, path: &Path, content: &str) -> Result<MutationEffect> {
        let target = self.workspace.resolve(path);
        if !target.is_file() {
            return Err(PipelineError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&target)
            .map_err(|err| PipelineError::io("open", &target, err))?;
        file.write_all(content.as_bytes())
            .map_err(|err| PipelineError::io("append", &target, err))?;
        Ok(MutationEffect::Changed)
    }

    /// Insert `content` right after the first occurrence of `anchor`.
    ///
    /// Only the first occurrence is used when the anchor repeats. A missing
    /// anchor fails with `AnchorNotFound` and leaves the file untouched.
    pub fn insert_after_anchor(
        &self,
        path: &Path,
        anchor: &str,
        content: &str,
    ) -> Result<MutationEffect> {
        let current = self.read(path)?;
        let updated = insert_after_first(&current, anchor, content).ok_or_else(|| {
            PipelineError::AnchorNotFound {
                path: path.to_path_buf(),
                anchor: anchor.to_string(),
            }
        })?;
        self.write(path, &updated)?;
        Ok(MutationEffect::Changed)
    }

    /// Replace all matches of `pattern`. Zero matches is a silent no-op.
    pub fn substitute_pattern(
        &self,
        path: &Path,
        pattern: &Pattern,
        replacement: &str,
    ) -> Result<MutationEffect> {
        let regex = pattern.compile()?;
        let current = self.read(path)?;
        let updated = substitute_all(&current, &regex, replacement);
        if updated == current.as_str() {
            debug!(pattern = pattern.as_str(), "pattern had no matches");
            return Ok(MutationEffect::Unchanged);
        }
        self.write(path, &updated)?;
        Ok(MutationEffect::Changed)
    }

    /// Delete a file or directory tree. Absent paths are not an error.
    pub fn remove(&self, path: &Path) -> Result<MutationEffect> {
        let target = self.workspace.resolve(path);
        let metadata = match fs::symlink_metadata(&target) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(MutationEffect::Unchanged);
            }
            Err(err) => return Err(PipelineError::io("stat", &target, err)),
        };
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&target)
        } else {
            fs::remove_file(&target)
        };
        removed.map_err(|err| PipelineError::io("remove", &target, err))?;
        Ok(MutationEffect::Changed)
    }

    fn read(&self, path: &Path) -> Result<String> {
        let target = self.workspace.resolve(path);
        fs::read_to_string(&target).map_err(|err| match err.kind() {
            ErrorKind::NotFound => PipelineError::NotFound {
                path: path.to_path_buf(),
            },
            _ => PipelineError::io("read", &target, err),
        })
    }

    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let target = self.workspace.resolve(path);
        fs::write(&target, content).map_err(|err| PipelineError::io("write", &target, err))
    }
}

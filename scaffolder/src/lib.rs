//! Opinionated Rails project scaffolding pipeline.
//!
//! Takes a freshly generated Rails application and walks it through a fixed,
//! ordered table of steps: file edits, external tool invocations and a git
//! checkpoint after each stage. Hosting remotes are provisioned at the end.
//!
//! - **[`core`]**: Pure, deterministic logic (name cleaning, text rewrites,
//!   mutation and command values, the Gemfile editor). No I/O.
//! - **[`io`]**: Side-effecting operations (filesystem mutation, process
//!   execution, git, checkpoints, settings, templates).
//! - **[`hosting`]**: Remote integration adapters behind one trait.
//!
//! [`steps`] builds the step table and [`pipeline`] runs it.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod hosting;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

//! Side-effecting components: files, processes, git, configuration.

pub mod checkpoint;
pub mod config;
pub mod git;
pub mod mutator;
pub mod process;
pub mod runner;
pub mod templates;
pub mod workspace;

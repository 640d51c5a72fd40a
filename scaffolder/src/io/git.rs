//! Git command builders.
//!
//! Every git invocation goes through the [`CommandRunner`](super::runner::CommandRunner),
//! so this module only shapes argument lists and parses the few outputs the
//! pipeline reads back.

use tracing::{debug, warn};

use super::runner::CommandRunner;
use super::workspace::Workspace;
use crate::core::types::{CommandSpec, FailurePolicy};

const GIT: &str = "git";

fn git<const N: usize>(args: [&str; N], policy: FailurePolicy) -> CommandSpec {
    CommandSpec {
        program: GIT.to_string(),
        args: args.iter().map(|arg| (*arg).to_string()).collect(),
        policy,
    }
}

/// `git init`; nothing downstream works without a repository.
pub fn init() -> CommandSpec {
    git(["init"], FailurePolicy::AbortOnFailure)
}

/// Stage tracked and untracked changes.
pub fn add_all(policy: FailurePolicy) -> CommandSpec {
    git(["add", "--all", "."], policy)
}

pub fn commit(message: &str, policy: FailurePolicy) -> CommandSpec {
    git(["commit", "-m", message], policy)
}

/// Create and checkout a new branch at current HEAD.
pub fn checkout_new_branch(branch: &str) -> CommandSpec {
    git(["checkout", "-b", branch], FailurePolicy::AbortOnFailure)
}

pub fn remote_add(name: &str, url: &str) -> CommandSpec {
    git(["remote", "add", name, url], FailurePolicy::WarnAndContinue)
}

/// Push every local branch and set upstream tracking.
pub fn push_all_with_upstream(remote: &str) -> CommandSpec {
    git(["push", "-u", remote, "--all"], FailurePolicy::WarnAndContinue)
}

pub fn push_branch(remote: &str, branch: &str) -> CommandSpec {
    git(["push", remote, branch], FailurePolicy::WarnAndContinue)
}

/// Return the current branch name, or `None` on detached HEAD or failure.
///
/// Uses `symbolic-ref`, which also answers on an unborn branch right after `git init`.
pub fn current_branch<R: CommandRunner + ?Sized>(
    runner: &R,
    workspace: &Workspace,
) -> Option<String> {
    let args = ["symbolic-ref", "--short", "HEAD"].map(String::from);
    let result = runner.run(workspace, GIT, &args);
    if !result.succeeded {
        warn!(output = %result.output.trim(), "could not read current branch");
        return None;
    }
    let name = parse_branch_name(&result.output);
    debug!(branch = ?name, "current branch");
    name
}

/// Whether a remote called `name` is configured (`git remote get-url` exits 0).
pub fn remote_exists<R: CommandRunner + ?Sized>(
    runner: &R,
    workspace: &Workspace,
    name: &str,
) -> bool {
    let args = ["remote", "get-url", name].map(String::from);
    let exists = runner.run(workspace, GIT, &args).succeeded;
    debug!(remote = name, exists, "remote lookup");
    exists
}

fn parse_branch_name(output: &str) -> Option<String> {
    let name = output.lines().next()?.trim();
    if name.is_empty() || name == "HEAD" {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_keeps_message_as_single_arg() {
        let spec = commit("add gems", FailurePolicy::WarnAndContinue);
        assert_eq!(spec.args, vec!["commit", "-m", "add gems"]);
    }

    #[test]
    fn push_all_sets_upstream() {
        assert_eq!(
            push_all_with_upstream("origin").to_string(),
            "git push -u origin --all"
        );
    }

    #[test]
    fn parses_branch_name() {
        assert_eq!(parse_branch_name("main\n"), Some("main".to_string()));
        assert_eq!(parse_branch_name("HEAD\n"), None);
        assert_eq!(parse_branch_name(""), None);
    }
}

//! Hosting adapters driven by the orchestrator after the step table completes.

use scaffolder::hosting::{
    BitbucketAdapter, GithubAdapter, HerokuAdapter, HostingAdapter, Provider, RemoteWiring,
    select_adapters,
};
use scaffolder::io::config::{Configuration, FeatureFlags, Settings};
use scaffolder::pipeline::{PipelineReport, run_pipeline};
use scaffolder::test_support::{FakeAdapter, RecordingRunner, TestSkeleton};

const HEROKU_CREATE_OUTPUT: &str = "Creating blog-app... done\n\
https://blog-app.herokuapp.com/ | https://git.heroku.com/blog-app.git\n";

fn run(runner: &RecordingRunner, adapters: &[Box<dyn HostingAdapter>]) -> PipelineReport {
    let skeleton = TestSkeleton::new().expect("skeleton");
    let mut config = Configuration::new("blog-app");
    config.organization = Some("acme".to_string());
    run_pipeline(
        &skeleton.workspace(),
        runner,
        &config,
        &Settings::default(),
        adapters,
    )
    .expect("pipeline")
}

#[test]
fn no_flags_means_no_remote_activity() {
    let runner = RecordingRunner::rails();
    let adapters = select_adapters(&FeatureFlags::default(), &Settings::default());

    let report = run(&runner, &adapters);

    assert!(report.remotes.is_empty());
    assert_eq!(runner.count("heroku"), 0);
    assert_eq!(runner.count("gh "), 0);
    assert_eq!(runner.count("git remote"), 0);
    assert_eq!(runner.count("git push"), 0);
}

#[test]
fn heroku_creates_then_pushes_base_branch() {
    let runner = RecordingRunner::rails().output_for("heroku create", HEROKU_CREATE_OUTPUT);
    let adapters: Vec<Box<dyn HostingAdapter>> = vec![Box::new(HerokuAdapter)];

    let report = run(&runner, &adapters);

    let commands = runner.invocations();
    let create = commands
        .iter()
        .position(|line| line == "heroku create blog-app --team acme")
        .expect("heroku create");
    let push = commands
        .iter()
        .position(|line| line == "git push heroku main")
        .expect("push to heroku");
    let develop = commands
        .iter()
        .position(|line| line == "git checkout -b develop")
        .expect("develop branch");
    assert!(develop < create && create < push);

    let outcome = &report.remotes[0];
    assert_eq!(outcome.provider, Provider::Heroku);
    assert!(outcome.created && outcome.pushed);
    assert_eq!(
        outcome.url.as_deref(),
        Some("https://git.heroku.com/blog-app.git")
    );
}

#[test]
fn failed_creation_skips_push_and_other_adapters_continue() {
    let runner = RecordingRunner::rails().fail_on("heroku create");
    let adapters: Vec<Box<dyn HostingAdapter>> =
        vec![Box::new(HerokuAdapter), Box::new(GithubAdapter)];

    let report = run(&runner, &adapters);

    assert_eq!(runner.count("git push heroku"), 0);
    assert_eq!(
        runner.count("gh repo create acme/blog_app --private --source . --remote origin"),
        1
    );
    assert_eq!(runner.count("git push -u origin --all"), 1);

    let heroku = &report.remotes[0];
    assert!(!heroku.created && !heroku.pushed);
    assert!(heroku.error.as_deref().is_some_and(|err| err.contains("heroku")));
    let github = &report.remotes[1];
    assert!(github.created && github.pushed);
    assert!(report.has_warnings());
}

#[test]
fn attached_remote_gets_origin_and_push_all() {
    let runner = RecordingRunner::rails();
    let adapter = FakeAdapter::new(
        Provider::Bitbucket,
        RemoteWiring::AttachOrigin,
        Ok(Some("git@bitbucket.org:acme/blog_app.git".to_string())),
    );
    let calls = adapter.calls();
    let adapters: Vec<Box<dyn HostingAdapter>> = vec![Box::new(adapter)];

    let report = run(&runner, &adapters);

    assert_eq!(
        calls.borrow().as_slice(),
        [("blog_app".to_string(), Some("acme".to_string()))]
    );
    let commands = runner.invocations();
    let tail: Vec<&str> = commands[commands.len() - 2..]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        [
            "git remote add origin git@bitbucket.org:acme/blog_app.git",
            "git push -u origin --all",
        ]
    );
    assert!(report.remotes[0].pushed);
}

#[test]
fn bitbucket_and_github_together_use_separate_remotes() {
    let runner = RecordingRunner::rails()
        .output_for("gh repo create", "https://github.com/acme/blog_app\n");
    let adapters: Vec<Box<dyn HostingAdapter>> = vec![
        Box::new(FakeAdapter::new(
            Provider::Bitbucket,
            RemoteWiring::AttachOrigin,
            Ok(Some("git@bitbucket.org:acme/blog_app.git".to_string())),
        )),
        Box::new(GithubAdapter),
    ];

    let report = run(&runner, &adapters);

    let commands = runner.invocations();
    let develop = commands
        .iter()
        .position(|line| line == "git checkout -b develop")
        .expect("develop branch");
    let tail: Vec<&str> = commands[develop + 1..]
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        [
            "git remote add origin git@bitbucket.org:acme/blog_app.git",
            "git push -u origin --all",
            "git remote get-url origin",
            "gh repo create acme/blog_app --private --source . --remote github",
            "git push -u github --all",
        ]
    );

    let github = &report.remotes[1];
    assert_eq!(github.provider, Provider::Github);
    assert!(github.created && github.pushed);
    assert!(github.error.is_none());
    assert_eq!(github.git_remote.as_deref(), Some("github"));
    assert_eq!(report.remotes[0].git_remote.as_deref(), Some("origin"));
    assert!(!report.has_warnings());
}

#[test]
fn attached_remote_without_url_is_not_pushed() {
    let runner = RecordingRunner::rails();
    let adapters: Vec<Box<dyn HostingAdapter>> = vec![Box::new(FakeAdapter::new(
        Provider::Bitbucket,
        RemoteWiring::AttachOrigin,
        Ok(None),
    ))];

    let report = run(&runner, &adapters);

    assert_eq!(runner.count("git remote add"), 0);
    assert_eq!(runner.count("git push"), 0);
    let outcome = &report.remotes[0];
    assert!(outcome.created);
    assert!(!outcome.pushed);
    assert!(outcome.error.is_none());
}

#[test]
fn failed_push_is_recorded_not_raised() {
    let runner = RecordingRunner::rails().fail_on("git push");
    let adapters: Vec<Box<dyn HostingAdapter>> = vec![Box::new(FakeAdapter::new(
        Provider::Github,
        RemoteWiring::SelfWired,
        Ok(None),
    ))];

    let report = run(&runner, &adapters);

    assert_eq!(runner.count("git push fake main"), 1);
    assert!(report.remotes[0].created);
    assert!(!report.remotes[0].pushed);
    assert_eq!(report.command_failures.len(), 1);
}

#[test]
fn bitbucket_without_credentials_degrades() {
    let runner = RecordingRunner::rails();
    let adapters: Vec<Box<dyn HostingAdapter>> = vec![Box::new(BitbucketAdapter::new(
        "http://127.0.0.1:9",
        None,
    ))];

    let report = run(&runner, &adapters);

    let outcome = &report.remotes[0];
    assert_eq!(outcome.provider, Provider::Bitbucket);
    assert!(!outcome.created);
    assert!(outcome.error.is_some());
    assert_eq!(runner.count("git remote"), 0);
    assert_eq!(runner.count("git push"), 0);
}

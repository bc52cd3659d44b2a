//! End-to-end library tests against real repositories and bare remotes.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use cadence_rs::git::{ConsistencyError, ExecutionError, Git2Transport, PushFailure, PushTransport};
use cadence_rs::{Error, Stage, Synthesizer};
use git2::Repository;

use crate::fixtures::git::{branch_tip, commit_count, commit_file, init_bare_repo, init_repo};
use crate::fixtures::plan::{SCENARIO_PLAN, SCENARIO_PREFIX, settings};

fn no_cancel() -> AtomicBool {
    AtomicBool::new(false)
}

/// Drops the connection a fixed number of times, then pushes for real.
struct FlakyTransport {
    failures_left: u32,
    calls: u32,
}

impl PushTransport for FlakyTransport {
    fn push(
        &mut self,
        repo: &Repository,
        remote: &str,
        refspec: &str,
        timeout: Duration,
        cancel: &AtomicBool,
    ) -> Result<(), PushFailure> {
        self.calls += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(PushFailure::Network(git2::Error::new(
                git2::ErrorCode::GenericError,
                git2::ErrorClass::Net,
                "connection reset by peer",
            )));
        }
        Git2Transport.push(repo, remote, refspec, timeout, cancel)
    }
}

#[test]
fn resume_applies_only_missing_dates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resumed = dir.path().join("resumed");
    let fresh = dir.path().join("fresh");

    // First run stops after the third lit date.
    let mut synth = Synthesizer::new(settings(&resumed, None));
    let first = synth.run(SCENARIO_PREFIX, &no_cancel()).expect("first run");
    assert_eq!(first.execution.applied.len(), 10);

    let second = synth.run(SCENARIO_PLAN, &no_cancel()).expect("resumed run");
    assert_eq!(second.execution.skipped, 10);
    assert_eq!(second.execution.applied.len(), 13);
    let resumed_dates: Vec<_> = second
        .execution
        .applied
        .iter()
        .map(|commit| commit.date.to_string())
        .collect();
    assert_eq!(resumed_dates.first().map(String::as_str), Some("2024-03-07"));
    assert_eq!(resumed_dates.last().map(String::as_str), Some("2024-03-08"));

    // Same commits as an uninterrupted run, down to the object ids.
    let mut uninterrupted = Synthesizer::new(settings(&fresh, None));
    let full = uninterrupted.run(SCENARIO_PLAN, &no_cancel()).expect("fresh run");
    assert_eq!(full.execution.applied.len(), 23);
    assert_eq!(second.execution.head, full.execution.head);
    assert_eq!(commit_count(&resumed).expect("count"), 23);
}

#[test]
fn rerun_of_complete_plan_is_a_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let mut synth = Synthesizer::new(settings(&repo, None));
    synth.run(SCENARIO_PLAN, &no_cancel()).expect("run");
    let head = branch_tip(&repo, "main").expect("tip");

    let again = synth.run(SCENARIO_PLAN, &no_cancel()).expect("rerun");
    assert!(again.execution.applied.is_empty());
    assert_eq!(again.execution.skipped, 23);
    assert_eq!(branch_tip(&repo, "main").expect("tip"), head);
}

#[test]
fn forged_time_is_separate_from_commit_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo_path = dir.path().join("repo");
    let mut synth = Synthesizer::new(settings(&repo_path, None));
    let outcome = synth.run(SCENARIO_PLAN, &no_cancel()).expect("run");

    let repo = Repository::open(&repo_path).expect("open");
    let mut previous: Option<i64> = None;
    for applied in &outcome.execution.applied {
        let commit = repo.find_commit(applied.oid).expect("commit");
        let when = commit.author().when();
        assert_eq!(when.seconds(), applied.declared_at.unix_timestamp());
        assert_eq!(commit.committer().when().seconds(), when.seconds());
        if let Some(prev) = previous {
            assert!(when.seconds() > prev, "timestamps must increase");
        }
        previous = Some(when.seconds());
    }

    let content = std::fs::read_to_string(repo_path.join("cadence.txt")).expect("content");
    let tokens: Vec<_> = content
        .lines()
        .map(|line| line.split(' ').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(tokens.len(), 23);
    assert_eq!(tokens[0], "cadence-000001");
    assert_eq!(tokens[22], "cadence-000023");
}

#[test]
fn foreign_commit_is_a_consistency_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo_path = dir.path().join("repo");
    let repo = init_repo(&repo_path).expect("init");
    commit_file(&repo, "README.md", "hello").expect("commit");
    drop(repo);

    let mut synth = Synthesizer::new(settings(&repo_path, None));
    let err = synth.run(SCENARIO_PLAN, &no_cancel()).unwrap_err();
    assert!(matches!(
        err,
        Error::Consistency(ConsistencyError::TimestampMismatch { position: 0, .. })
    ));
    assert_eq!(err.stage(), Stage::Execute);
    assert_eq!(err.exit_code(), 3);
    assert_eq!(commit_count(&repo_path).expect("count"), 1);
}

#[test]
fn changed_plan_on_existing_history_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let mut synth = Synthesizer::new(settings(&repo, None));
    synth.run(SCENARIO_PLAN, &no_cancel()).expect("run");

    let err = synth.run("0:1 4\n", &no_cancel()).unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
    assert_eq!(commit_count(&repo).expect("count"), 23);
}

#[test]
fn interrupted_run_reports_resume_point() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let mut synth = Synthesizer::new(settings(&repo, None));
    synth.run(SCENARIO_PREFIX, &no_cancel()).expect("prefix");

    let plan = synth.prepare(SCENARIO_PLAN).expect("prepare");
    let err = synth.execute(&plan, &AtomicBool::new(true)).unwrap_err();
    let Error::Execution(exec) = &err else {
        panic!("expected execution error, got {err:?}");
    };
    assert!(matches!(exec, ExecutionError::Interrupted { .. }));
    assert_eq!(exec.resume_at(), Some(10));
    assert!(err.to_string().contains("last applied date 2024-03-06"));
    assert_eq!(err.exit_code(), 130);
}

#[test]
fn failed_commit_keeps_earlier_commits_and_resumes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let mut synth = Synthesizer::new(settings(&repo, None));
    synth.run(SCENARIO_PREFIX, &no_cancel()).expect("prefix");

    // The content file can no longer be written.
    let content = repo.join("cadence.txt");
    std::fs::remove_file(&content).expect("remove content");
    std::fs::create_dir(&content).expect("block content");

    let err = synth.run(SCENARIO_PLAN, &no_cancel()).unwrap_err();
    let Error::Execution(exec) = &err else {
        panic!("expected execution error, got {err:?}");
    };
    assert!(matches!(exec, ExecutionError::Workdir { position: 10, .. }));
    assert_eq!(exec.resume_at(), Some(10));
    assert_eq!(err.exit_code(), 2);
    let message = err.to_string();
    assert!(message.contains("#10 (2024-03-07)"), "{message}");
    assert!(message.contains("last applied date 2024-03-06"), "{message}");
    assert_eq!(commit_count(&repo).expect("count"), 10);

    let plan = synth.prepare(SCENARIO_PLAN).expect("prepare");
    let status = synth.status(&plan).expect("status");
    assert_eq!(status.applied, 10);
    assert_eq!(status.next_date.as_deref(), Some("2024-03-07"));

    std::fs::remove_dir(&content).expect("unblock content");
    let resumed = synth.run(SCENARIO_PLAN, &no_cancel()).expect("resume");
    assert_eq!(resumed.execution.skipped, 10);
    assert_eq!(resumed.execution.applied.len(), 13);
    assert_eq!(commit_count(&repo).expect("count"), 23);
}

#[test]
fn wrong_weekday_anchor_fails_before_repository_exists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let mut run_settings = settings(&repo, None);
    run_settings.plan.anchor = "2024-03-04".to_string();
    let mut synth = Synthesizer::new(run_settings);

    let err = synth.run(SCENARIO_PLAN, &no_cancel()).unwrap_err();
    assert_eq!(err.stage(), Stage::Validate);
    assert!(err.to_string().contains("2024-03-04"));
    assert!(!repo.exists());
}

#[test]
fn publishes_to_bare_remote() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let remote = dir.path().join("remote.git");
    init_bare_repo(&remote).expect("bare");

    let mut synth = Synthesizer::new(settings(&repo, Some(&remote)));
    let outcome = synth.run(SCENARIO_PLAN, &no_cancel()).expect("run");
    let report = outcome.publish.expect("published");
    assert_eq!(report.attempts, 1);
    assert_eq!(
        branch_tip(&remote, "main").expect("remote tip"),
        outcome.execution.head
    );

    // Publishing again is idempotent.
    let plan = synth.prepare(SCENARIO_PLAN).expect("prepare");
    synth.publish(&plan, &no_cancel()).expect("republish");
    assert_eq!(
        branch_tip(&remote, "main").expect("remote tip"),
        outcome.execution.head
    );
}

#[test]
fn dropped_connections_are_retried_without_duplicating_commits() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let remote = dir.path().join("remote.git");
    init_bare_repo(&remote).expect("bare");

    let mut run_settings = settings(&repo, Some(&remote));
    run_settings.publish.max_attempts = 3;
    let mut transport = FlakyTransport {
        failures_left: 2,
        calls: 0,
    };
    let mut synth = Synthesizer::with_transport(run_settings, &mut transport);
    let outcome = synth.run(SCENARIO_PLAN, &no_cancel()).expect("run");
    drop(synth);

    let report = outcome.publish.expect("published");
    assert_eq!(report.attempts, 3);
    assert_eq!(report.delays.len(), 2);
    assert_eq!(transport.calls, 3);
    assert_eq!(outcome.execution.applied.len(), 23);
    assert_eq!(commit_count(&repo).expect("count"), 23);
    assert_eq!(
        branch_tip(&remote, "main").expect("remote tip"),
        outcome.execution.head
    );
}

#[test]
fn diverged_remote_is_rejected_without_retry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = dir.path().join("repo");
    let remote = dir.path().join("remote.git");
    init_bare_repo(&remote).expect("bare");

    // Someone else pushed an unrelated main first.
    let other = dir.path().join("other");
    let other_repo = init_repo(&other).expect("other");
    commit_file(&other_repo, "README.md", "theirs").expect("commit");
    let mut origin = other_repo
        .remote("origin", &remote.display().to_string())
        .expect("remote");
    origin
        .push(&["refs/heads/main:refs/heads/main"], None)
        .expect("push");
    let theirs = branch_tip(&remote, "main").expect("tip");

    let mut synth = Synthesizer::new(settings(&repo, Some(&remote)));
    let err = synth.run(SCENARIO_PLAN, &no_cancel()).unwrap_err();
    assert_eq!(err.stage(), Stage::Publish);
    assert_eq!(err.exit_code(), 4);
    assert_eq!(branch_tip(&remote, "main").expect("tip"), theirs);
    // Local history is kept for a later publish.
    assert_eq!(commit_count(&repo).expect("count"), 23);
}

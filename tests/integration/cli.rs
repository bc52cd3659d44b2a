//! Runs the `cadence` binary against temp repositories.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use crate::fixtures::git::{branch_tip, commit_count, init_bare_repo};
use crate::fixtures::plan::{ANCHOR, SCENARIO_PLAN, SCENARIO_PREFIX, write_plan};

/// Isolated config, data and working directories for one test.
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        for dir in ["config", "data", "work"] {
            std::fs::create_dir_all(root.path().join(dir)).expect("mkdir");
        }
        Self { root }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn cadence(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cadence");
        cmd.current_dir(self.path().join("work"));
        cmd.env("CADENCE_CONFIG_DIR", self.path().join("config"));
        cmd.env("CADENCE_DATA_DIR", self.path().join("data"));
        for var in [
            "CADENCE_EMAIL",
            "CADENCE_NAME",
            "CADENCE_REMOTE",
            "CADENCE_BRANCH",
            "CADENCE_ALLOW_FUTURE",
            "CADENCE_PUBLISH_MAX_ATTEMPTS",
            "CADENCE_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }
}

#[test]
fn plan_prints_summary_without_touching_disk() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);

    sandbox
        .cadence()
        .args(["plan", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR])
        .assert()
        .success()
        .stdout(predicate::str::contains("23 commits on 5 dates"))
        .stdout(predicate::str::contains("2024-03-07   10"));

    assert!(!sandbox.path().join("data").join("workspaces").exists());
}

#[test]
fn plan_json_reports_counts() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);

    let output = sandbox
        .cadence()
        .args(["--json", "plan", "--plan"])
        .arg(&plan)
        .args(["--anchor", "03/03/2024"])
        .output()
        .expect("run cadence");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["plan"]["total_commits"], 23);
    assert_eq!(json["plan"]["committed_dates"], 5);
    assert_eq!(json["plan"]["days"][0]["date"], "2024-03-04");
}

#[test]
fn malformed_plan_names_line_and_stage() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), "0:1 1\n0:2 seven\n0:3 9\n");
    let repo = sandbox.path().join("repo");

    sandbox
        .cadence()
        .args(["run", "--no-push", "--email", "painter@example.com", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[validate]"))
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("line 3"));

    assert!(!repo.exists());
}

#[test]
fn anchor_on_wrong_weekday_is_rejected() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);
    let repo = sandbox.path().join("repo");

    sandbox
        .cadence()
        .args(["run", "--no-push", "--email", "painter@example.com", "--plan"])
        .arg(&plan)
        .args(["--anchor", "2024-03-05", "--repo"])
        .arg(&repo)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Tuesday"));

    assert!(!repo.exists());
}

#[test]
fn run_without_email_is_a_config_error() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);
    let repo = sandbox.path().join("repo");

    sandbox
        .cadence()
        .args(["run", "--no-push", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[config]"))
        .stderr(predicate::str::contains("identity.email"));

    assert!(!repo.exists());
}

#[test]
fn run_resumes_and_status_tracks_progress() {
    let sandbox = Sandbox::new();
    let prefix = sandbox.path().join("prefix.plan");
    std::fs::write(&prefix, SCENARIO_PREFIX).expect("write prefix");
    let full = write_plan(sandbox.path(), SCENARIO_PLAN);
    let repo = sandbox.path().join("repo");

    sandbox
        .cadence()
        .env("CADENCE_EMAIL", "painter@example.com")
        .args(["run", "--no-push", "--plan"])
        .arg(&prefix)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("committed: 10"));

    sandbox
        .cadence()
        .args(["status", "--plan"])
        .arg(&full)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("applied: 10 / 23"))
        .stdout(predicate::str::contains("next: #10 on 2024-03-07"));

    sandbox
        .cadence()
        .env("CADENCE_EMAIL", "painter@example.com")
        .args(["run", "--no-push", "--plan"])
        .arg(&full)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("resumed: 10 commits already present"))
        .stdout(predicate::str::contains("committed: 13"))
        .stdout(predicate::str::contains("not pushed"));

    let output = sandbox
        .cadence()
        .args(["--json", "status", "--plan"])
        .arg(&full)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .output()
        .expect("run cadence");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["status"]["complete"], true);
    assert_eq!(json["status"]["applied"], 23);
    assert_eq!(commit_count(&repo).expect("count"), 23);
}

#[test]
fn run_pushes_to_remote_and_publish_is_repeatable() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);
    let remote = sandbox.path().join("remote.git");
    init_bare_repo(&remote).expect("bare");
    let remote_url = remote.display().to_string();

    // No --repo: the workspace is derived from the remote name.
    sandbox
        .cadence()
        .args(["run", "--email", "painter@example.com", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR, "--remote", &remote_url])
        .assert()
        .success()
        .stdout(predicate::str::contains("pushed to origin"));

    let workspace = sandbox
        .path()
        .join("data")
        .join("workspaces")
        .join("remote");
    let local_tip = branch_tip(&workspace, "main").expect("local tip");
    assert!(local_tip.is_some());
    assert_eq!(branch_tip(&remote, "main").expect("remote tip"), local_tip);

    sandbox
        .cadence()
        .args(["publish", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR, "--remote", &remote_url])
        .assert()
        .success()
        .stdout(predicate::str::contains("pushed to origin"));
}

#[test]
fn publish_before_execute_fails_with_publish_code() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);
    let repo = sandbox.path().join("repo");

    sandbox
        .cadence()
        .args(["publish", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR, "--repo"])
        .arg(&repo)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("0 of 23"));
}

#[test]
fn project_config_file_is_applied() {
    let sandbox = Sandbox::new();
    let plan = write_plan(sandbox.path(), SCENARIO_PLAN);
    std::fs::write(
        sandbox.path().join("work").join("cadence.toml"),
        "[commits]\nscale = [0, 1, 2, 3, 4]\n",
    )
    .expect("write project config");

    sandbox
        .cadence()
        .args(["plan", "--plan"])
        .arg(&plan)
        .args(["--anchor", ANCHOR])
        .assert()
        .success()
        .stdout(predicate::str::contains("12 commits on 5 dates"));
}

#[test]
fn config_write_persists_effective_config() {
    let sandbox = Sandbox::new();
    let target = sandbox.path().join("written.toml");

    sandbox
        .cadence()
        .env("CADENCE_BRANCH", "art")
        .args(["config", "--write"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("branch = \"art\""));

    let written = std::fs::read_to_string(&target).expect("read written config");
    assert!(written.contains("branch = \"art\""));
}

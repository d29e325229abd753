#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// A temp directory holding a code tree, a data dir and a config file.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        std::fs::write(
            dir.path().join("config.yaml"),
            format!("data_dir: {}\n", data.display()),
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("code")).unwrap();
        Self { dir }
    }

    fn code(&self) -> PathBuf {
        self.dir.path().join("code")
    }

    fn repo(&self, rel: &str) {
        std::fs::create_dir_all(self.code().join(rel).join(".git")).unwrap();
    }

    /// `acme` with `github.com/x/y` in base and `github.com/x/z` in story T1.
    fn acme(self) -> Self {
        self.repo("acme/base/src/github.com/x/y");
        self.repo("acme/stories/T1/src/github.com/x/z");
        self
    }

    fn swm(&self) -> Command {
        let mut cmd = Command::cargo_bin("swm").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("SWM_PROFILE")
            .env_remove("SWM_STORY_NAME")
            .env_remove("SWM_IGNORE_PATTERN")
            .env_remove("RUST_LOG")
            .env("SWM_CODE_PATH", self.code())
            .env("SWM_CONFIG", self.dir.path().join("config.yaml"));
        cmd
    }
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

fn import_paths(rows: &serde_json::Value) -> Vec<String> {
    let mut paths: Vec<String> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["import_path"].as_str().unwrap().to_string())
        .collect();
    paths.sort();
    paths
}

// ---------------------------------------------------------------------------
// swm code scan / list / path
// ---------------------------------------------------------------------------

#[test]
fn scan_reports_counts() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args(["code", "scan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 profiles, 2 stories, 2 projects"));
}

#[test]
fn list_story_includes_base_projects() {
    let fx = Fixture::new().acme();
    let rows = stdout_json(fx.swm().args(["--story", "T1", "code", "list", "--json"]));
    assert_eq!(import_paths(&rows), vec!["github.com/x/y", "github.com/x/z"]);

    for row in rows.as_array().unwrap() {
        assert_eq!(row["story"], "T1");
        let materialized = row["import_path"] == "github.com/x/z";
        assert_eq!(row["materialized"], materialized);
    }
}

#[test]
fn list_table_marks_virtual_projects() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args(["--story", "T1", "code", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("virtual"))
        .stdout(predicate::str::contains("materialized"))
        .stdout(predicate::str::contains("github.com/x/y"));
}

#[test]
fn list_all_shows_only_stored_projects() {
    let fx = Fixture::new().acme();
    let rows = stdout_json(fx.swm().args(["code", "list", "--all", "--json"]));
    let stories: Vec<(String, String)> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["story"].as_str().unwrap().to_string(),
                r["import_path"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(stories.len(), 2);
    assert!(stories.contains(&("base".to_string(), "github.com/x/y".to_string())));
    assert!(stories.contains(&("T1".to_string(), "github.com/x/z".to_string())));
}

#[test]
fn nested_repositories_are_not_listed() {
    let fx = Fixture::new().acme();
    fx.repo("acme/base/src/github.com/x/y/vendor/github.com/a/b");
    let rows = stdout_json(fx.swm().args(["code", "list", "--json"]));
    assert_eq!(import_paths(&rows), vec!["github.com/x/y"]);
}

#[test]
fn path_resolves_through_base() {
    let fx = Fixture::new().acme();
    let expected = fx.code().join("acme/stories/T1/src/github.com/x/y");
    fx.swm()
        .args(["--story", "T1", "code", "path", "github.com/x/y"])
        .assert()
        .success()
        .stdout(format!("{}\n", expected.display()));
    assert!(!expected.exists());
}

#[test]
fn unknown_project_fails() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args(["--story", "T1", "code", "path", "github.com/nope/nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("project 'github.com/nope/nope' not found"));
}

#[test]
fn ignored_profiles_are_skipped() {
    let fx = Fixture::new().acme();
    fx.repo("snapshot/base/src/github.com/x/y");
    fx.swm()
        .args(["code", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("several profiles found"));

    let rows = stdout_json(fx.swm().args([
        "--ignore-pattern",
        "^snap",
        "code",
        "list",
        "--all",
        "--json",
    ]));
    assert!(rows
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["profile"] == "acme"));
}

#[test]
fn missing_code_path_fails() {
    let fx = Fixture::new();
    fx.swm()
        .env("SWM_CODE_PATH", fx.dir.path().join("nope"))
        .args(["code", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("code path does not exist"));
}

#[test]
fn empty_code_path_fails() {
    let fx = Fixture::new();
    fx.swm()
        .env("SWM_CODE_PATH", "")
        .args(["code", "scan"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("code path is empty"));
}

#[test]
fn empty_code_path_env_falls_back_to_config() {
    let fx = Fixture::new().acme();
    let config = fx.dir.path().join("with-code.yaml");
    std::fs::write(
        &config,
        format!(
            "code_path: {}\ndata_dir: {}\n",
            fx.code().display(),
            fx.dir.path().join("data").display()
        ),
    )
    .unwrap();
    fx.swm()
        .env("SWM_CODE_PATH", "")
        .env("SWM_CONFIG", &config)
        .args(["code", "path", "github.com/x/y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/base/src/github.com/x/y"));
}

#[test]
fn empty_config_env_uses_the_home_config() {
    let fx = Fixture::new().acme();
    let home = fx.dir.path().join("home");
    std::fs::create_dir_all(home.join(".config/swm")).unwrap();
    std::fs::write(
        home.join(".config/swm/config.yaml"),
        format!("code_path: {}\n", fx.code().display()),
    )
    .unwrap();
    fx.swm()
        .env("HOME", &home)
        .env("SWM_CONFIG", "")
        .env("SWM_CODE_PATH", "")
        .args(["code", "scan"])
        .assert()
        .success();
}

#[test]
fn unknown_profile_fails() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args(["--profile", "nobody", "code", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("profile not found: nobody"));
}

#[test]
fn clone_rejects_bad_url() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args(["code", "clone", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid remote URL"));
}

// ---------------------------------------------------------------------------
// swm story
// ---------------------------------------------------------------------------

#[test]
fn story_create_list_show_remove() {
    let fx = Fixture::new();
    fx.swm()
        .args(["story", "create", "T1", "--branch", "feature/T1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created story 'T1' on branch 'feature/T1'"));
    fx.swm().args(["story", "create", "T2"]).assert().success();

    assert!(fx.dir.path().join("data/stories/T1.json").is_file());

    let list = stdout_json(fx.swm().args(["story", "list", "--json"]));
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["Name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["T1", "T2"]);

    let shown = stdout_json(fx.swm().env("SWM_STORY_NAME", "T2").args(["story", "show", "--json"]));
    assert_eq!(shown["BranchName"], "T2");

    fx.swm().args(["story", "remove", "T1"]).assert().success();
    fx.swm()
        .args(["story", "show", "T1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("story record not found: T1"));
}

#[test]
fn story_names_are_validated() {
    let fx = Fixture::new();
    fx.swm()
        .args(["story", "create", "a/b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error creating a new story"))
        .stderr(predicate::str::contains("invalid story name"));
    for name in ["a=b", "x@y"] {
        fx.swm()
            .args(["story", "create", name])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("invalid story name"));
    }
    fx.swm()
        .args(["story", "create", "base"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn story_show_needs_a_name() {
    let fx = Fixture::new();
    fx.swm()
        .args(["story", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no story selected"));
}

#[test]
fn story_list_empty() {
    let fx = Fixture::new();
    fx.swm()
        .args(["story", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stories."));
}

// ---------------------------------------------------------------------------
// swm tmux
// ---------------------------------------------------------------------------

#[test]
fn switch_client_rejects_both_selectors() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args([
            "tmux",
            "switch-client",
            "--project",
            "github.com/x/y",
            "--session",
            "acme@base=github\u{2022}com/x/y",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn switch_client_rejects_unknown_session() {
    let fx = Fixture::new().acme();
    fx.swm()
        .args(["tmux", "switch-client", "--session", "acme@T1=nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project for session name: acme@T1=nope"));
}

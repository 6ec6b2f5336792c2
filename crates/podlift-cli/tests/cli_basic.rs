use assert_cmd::Command;
use predicates::prelude::*;

fn podlift_cmd() -> Command {
    Command::cargo_bin("podlift").unwrap()
}

#[test]
fn test_no_args_prints_usage() {
    podlift_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    podlift_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_analyze_missing_podfile_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    podlift_cmd()
        .current_dir(tmp.path())
        .args(["analyze", "does-not-exist/Podfile.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_sync_without_repos_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    std::fs::write(&config, "").unwrap();
    podlift_cmd()
        .args(["--config", config.to_str().unwrap(), "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no repos configured"));
}

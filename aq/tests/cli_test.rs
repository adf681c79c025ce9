//! Smoke tests for the `aq` binary

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn aq() -> Command {
    Command::cargo_bin("aq").expect("aq binary should be built")
}

#[test]
fn test_help_lists_subcommands() {
    aq().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_prints_effective_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "refresh:\n  interval-secs: 15").unwrap();

    aq().arg("-c")
        .arg(file.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("interval-secs: 15"))
        .stdout(predicate::str::contains("debounce-delay-ms: 500"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "refresh:\n  interval-secs: 0").unwrap();

    aq().arg("-c")
        .arg(file.path())
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("interval-secs"));
}

#[test]
fn test_watch_requires_url() {
    aq().arg("watch").assert().failure();
}

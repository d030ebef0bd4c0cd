//! Integration tests for the `dls-provision` binary.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn help_lists_the_target_filter() {
    let mut command = cargo_bin_cmd!("dls-provision");
    command.arg("--help");
    command.assert().success().stdout(contains("--only"));
}

#[test]
fn missing_source_tree_fails_before_touching_output() {
    let repo = TempDir::new().expect("temp dir");
    let resources = repo.path().join("resources");
    fs::create_dir_all(&resources).expect("create resources");
    fs::write(resources.join("dlitescript-linux-x64"), b"stale").expect("seed stale binary");

    let mut command = cargo_bin_cmd!("dls-provision");
    command
        .arg("--repo-root")
        .arg(repo.path())
        .arg("--skip-sync");
    command
        .assert()
        .failure()
        .stderr(contains("DLiteScript source tree not found"));

    assert!(resources.join("dlitescript-linux-x64").exists());
}

#[test]
fn unsupported_platform_filter_fails() {
    let repo = TempDir::new().expect("temp dir");
    fs::create_dir_all(repo.path().join("dlitescript")).expect("create source tree");

    let mut command = cargo_bin_cmd!("dls-provision");
    command
        .arg("--repo-root")
        .arg(repo.path())
        .args(["--skip-sync", "--only", "solaris-sparc"]);
    command
        .assert()
        .failure()
        .stderr(contains("solaris-sparc"));
}

#[test]
fn missing_go_toolchain_fails_with_a_clear_message() {
    let repo = TempDir::new().expect("temp dir");
    fs::create_dir_all(repo.path().join("dlitescript")).expect("create source tree");

    let mut command = cargo_bin_cmd!("dls-provision");
    command
        .arg("--repo-root")
        .arg(repo.path())
        .args(["--skip-sync", "--go", "/nonexistent/go"]);
    command
        .assert()
        .failure()
        .stderr(contains("Go executable not found"));
}

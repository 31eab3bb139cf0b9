use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_profile(dir: &Path, name: &str, end: f64, points: usize) -> PathBuf {
    let mut csv = String::from("position,velocity,duration_ms\n");
    for i in 0..points {
        let pos = end * (i + 1) as f64 / points as f64;
        csv.push_str(&format!("{pos},{},10\n", if i + 1 == points { 0.0 } else { 60.0 }));
    }
    let path = dir.join(name);
    fs::write(&path, csv).unwrap();
    path
}

/// Config pointing at two 8-point profiles next to it.
fn write_setup(dir: &tempfile::TempDir) -> PathBuf {
    write_profile(dir.path(), "left.csv", 1.0, 8);
    write_profile(dir.path(), "right.csv", -0.5, 8);
    let toml = r#"
[streaming]
buffer_period_ms = 5
min_points_in_device = 5

[axes.left]
profile = "left.csv"

[axes.right]
profile = "right.csv"

[runner]
control_period_ms = 5
max_run_ms = 5000
"#;
    let cfg = dir.path().join("mpstream.toml");
    fs::write(&cfg, toml).unwrap();
    cfg
}

#[rstest]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("self-check"));
}

#[rstest]
fn run_reaches_target_with_config_profiles() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config").arg(&cfg).arg("run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("on target"));
}

#[rstest]
fn profile_flags_override_config() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    let other = tempdir().unwrap();
    let left = write_profile(other.path(), "l.csv", 0.25, 10);
    let right = write_profile(other.path(), "r.csv", 0.75, 10);
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--left")
        .arg(&left)
        .arg("--right")
        .arg(&right);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("target 0.250"))
        .stdout(predicate::str::contains("target 0.750"));
}

#[rstest]
fn stats_are_printed_to_stderr() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config").arg(&cfg).arg("run").arg("--stats");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Maneuver Stats"));
}

#[rstest]
fn tiny_max_run_exits_with_code_4() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--max-run-ms")
        .arg("1");
    cmd.assert()
        .code(4)
        .stderr(predicate::str::contains("max run time"));
}

#[rstest]
fn right_only_never_completes() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("run")
        .arg("--arm")
        .arg("right")
        .arg("--max-run-ms")
        .arg("400");
    cmd.assert().code(4);
}

#[rstest]
fn missing_profile_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[runner]\nmax_run_ms = 1000\n").unwrap();
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config").arg(&cfg).arg("run");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("no left profile"));
}

#[rstest]
fn bad_profile_header_is_explained() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    fs::write(dir.path().join("left.csv"), "pos,vel,dur\n0,0,10\n").unwrap();
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config").arg(&cfg).arg("run");
    cmd.assert().code(1).stderr(predicate::str::contains(
        "Expected 'position,velocity,duration_ms'",
    ));
}

#[rstest]
#[case("[streaming]\nbuffer_period_ms = 0\n")]
#[case("[runner]\nmax_run_ms = 0\n")]
#[case("[coordinator]\narm = \"middle\"\n")]
fn invalid_config_fails(#[case] toml: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, toml).unwrap();
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config").arg(&cfg).arg("health");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[rstest]
fn missing_config_file_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("health");
    cmd.assert().code(1).stderr(predicate::str::contains("read config"));
}

#[rstest]
fn health_and_self_check_succeed() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    Command::cargo_bin("mpstream")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("healthy"));
    Command::cargo_bin("mpstream")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check ok"));
}

#[rstest]
fn log_file_is_written() {
    let dir = tempdir().unwrap();
    let cfg = write_setup(&dir);
    let log = dir.path().join("run.log");
    let mut text = fs::read_to_string(&cfg).unwrap();
    text.push_str(&format!(
        "\n[logging]\nfile = {:?}\nlevel = \"info\"\n",
        log.to_string_lossy()
    ));
    fs::write(&cfg, text).unwrap();
    let mut cmd = Command::cargo_bin("mpstream").unwrap();
    cmd.arg("--config").arg(&cfg).arg("run");
    cmd.assert().success();
    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("maneuver on target"), "{contents}");
}

//! Integration tests for the `vpcviz` binary.
//!
//! Everything here runs against the bundled fixture or no inventory at
//! all; no test reaches a real inventory service.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vpcviz` binary with env isolation.
///
/// Clears the `VPCVIZ_*` variables the binary reads and points config
/// directories at a nonexistent path so tests never touch a real config.
fn vpcviz_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vpcviz");
    cmd.env("HOME", "/tmp/vpcviz-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/vpcviz-cli-test-nonexistent")
        .env_remove("VPCVIZ_CONFIG")
        .env_remove("VPCVIZ_API_KEY")
        .env_remove("VPCVIZ_LISTEN")
        .env_remove("VPCVIZ_FEED_MODE")
        .env_remove("VPCVIZ_INVENTORY__ENDPOINT")
        .env_remove("VPCVIZ_INVENTORY__API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn fixture_path() -> String {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/fixture.json").to_owned()
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = vpcviz_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    vpcviz_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("topology")
            .and(predicate::str::contains("serve"))
            .and(predicate::str::contains("snapshot"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    vpcviz_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpcviz"));
}

#[test]
fn test_invalid_lineage() {
    let output = vpcviz_cmd().args(["snapshot", "subnets"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("subnets"), "Expected rejected value in output:\n{text}");
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    vpcviz_cmd()
        .args(["config", "path", "--config", "/tmp/elsewhere/vpcviz.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere/vpcviz.toml"));
}

#[test]
fn test_config_path_defaults_to_platform_dir() {
    vpcviz_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_redacts_api_key() {
    let file = write_config(
        r#"
feed_mode = "push"

[inventory]
endpoint = "https://inventory.internal/v1/"
api_key = "super-secret-key"

[engine]
refresh_interval_secs = 30
"#,
    );

    vpcviz_cmd()
        .args(["config", "show", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("<redacted>")
                .and(predicate::str::contains("super-secret-key").not())
                .and(predicate::str::contains("feed_mode = \"push\""))
                .and(predicate::str::contains("refresh_interval_secs = 30")),
        );
}

#[test]
fn test_config_show_rejects_bad_toml() {
    let file = write_config("[engine]\nrefresh_interval_secs = \"soon\"\n");

    let output = vpcviz_cmd()
        .args(["config", "show", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4), "Expected config exit code");
}

// ── Snapshot ────────────────────────────────────────────────────────

#[test]
fn test_snapshot_without_endpoint_is_config_error() {
    let output = vpcviz_cmd().args(["snapshot", "vpc"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4), "Expected config exit code");
    let text = combined_output(&output);
    assert!(
        text.contains("inventory.endpoint"),
        "Expected missing field in output:\n{text}"
    );
}

#[test]
fn test_snapshot_without_credentials_is_config_error() {
    let file = write_config("[inventory]\nendpoint = \"https://inventory.internal/v1/\"\n");

    let output = vpcviz_cmd()
        .args(["snapshot", "stack", "--config"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("VPCVIZ_API_KEY"), "Expected checked sources:\n{text}");
}

#[test]
fn test_snapshot_vpc_from_fixture() {
    vpcviz_cmd()
        .args(["snapshot", "vpc", "--fixture", &fixture_path()])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"Generation\": 1")
                .and(predicate::str::contains("\"VPCID\": \"vpc-0a1b\""))
                .and(predicate::str::contains("\"SubnetID\": \"subnet-11\""))
                .and(predicate::str::contains("\"Name\": \"web-1\""))
                .and(predicate::str::contains("Degraded").not()),
        );
}

#[test]
fn test_snapshot_stack_compact_from_fixture() {
    let output = vpcviz_cmd()
        .args(["snapshot", "stack", "--compact", "--fixture", &fixture_path()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1, "Expected one line:\n{stdout}");

    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let web_app = &value["Stacks"][0];
    assert_eq!(web_app["Name"], "web-app");
    assert_eq!(web_app["AutoScalingGroups"][0]["Name"], "web-app-asg");
    assert_eq!(web_app["AutoScalingGroups"][0]["Instances"][1]["InstanceID"], "i-0002");
    assert_eq!(web_app["Instances"][0]["InstanceID"], "i-0004");
    assert_eq!(web_app["Resources"][0]["Type"], "AWS::S3::Bucket");

    // A member still being created has no physical id yet.
    let pending = &value["Stacks"][1];
    assert_eq!(pending["Resources"][0]["LogicalID"], "Worker");
    assert_eq!(pending["Resources"][0]["PhysicalID"], "");
}

#[test]
fn test_snapshot_missing_fixture() {
    let output = vpcviz_cmd()
        .args(["snapshot", "vpc", "--fixture", "/tmp/vpcviz-no-such-fixture.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("cannot read fixture"), "{text}");
}

// ── Serve ───────────────────────────────────────────────────────────

#[test]
fn test_serve_on_taken_port_fails_fast() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let output = vpcviz_cmd()
        .args(["serve", "--listen", &addr, "--fixture", &fixture_path()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "Expected connection exit code");
    let text = combined_output(&output);
    assert!(text.contains(&addr), "Expected address in output:\n{text}");
}

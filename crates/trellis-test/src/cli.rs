//! CLI regression tests for the `trellis` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes and output formats.
//!
//! Run with: `cargo test -p trellis-test`
//! Requires the `trellis` binary to be built first (`cargo build -p trellis`).

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `trellis` binary.
fn trellis() -> Command {
    // cargo_bin is deprecated for custom build-dir setups; fine for standard workspace use.
    #[allow(deprecated)]
    Command::cargo_bin("trellis")
        .expect("trellis binary not found, run `cargo build -p trellis` first")
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/trellis-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

fn resolve(method: &str, path: &str) -> Command {
    let mut cmd = trellis();
    cmd.args(["resolve", "--routes"])
        .arg(fixtures().join("routes.yaml"))
        .args(["--method", method, "--path", path]);
    cmd
}

// ---------------------------------------------------------------------------
// trellis validate
// ---------------------------------------------------------------------------

#[test]
fn validate_valid_table_exits_zero() {
    trellis()
        .args(["validate", "--routes"])
        .arg(fixtures().join("routes.yaml"))
        .assert()
        .success()
        .stderr(contains("is valid (8 route(s))"));
}

#[test]
fn validate_conflict_exits_one() {
    trellis()
        .args(["validate", "--routes"])
        .arg(fixtures().join("conflict.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("R1003"))
        .stderr(contains("R1002"))
        .stderr(contains("[GET /users/new]"));
}

#[test]
fn validate_malformed_patterns_exits_one() {
    trellis()
        .args(["validate", "--routes"])
        .arg(fixtures().join("malformed-pattern.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("has 3 error(s)"))
        .stderr(contains("R1004"))
        .stderr(contains("R1006"))
        .stderr(contains("R1001"));
}

#[test]
fn validate_invalid_yaml_exits_one() {
    trellis()
        .args(["validate", "--routes"])
        .arg(fixtures().join("invalid-yaml.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("R1009"));
}

#[test]
fn validate_missing_file_exits_one() {
    trellis()
        .args(["validate", "--routes", "this-file-does-not-exist.yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("R1000"));
}

#[test]
fn validate_multiple_files_reports_summary() {
    trellis()
        .args(["validate", "--routes"])
        .arg(fixtures().join("routes.yaml"))
        .arg(fixtures().join("conflict.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("validated 2 route table(s): 1 valid, 1 invalid"));
}

#[test]
fn validate_json_format_outputs_json() {
    let output = trellis()
        .args(["validate", "--format", "json", "--routes"])
        .arg(fixtures().join("routes.yaml"))
        .arg(fixtures().join("conflict.yaml"))
        .output()
        .expect("failed to run trellis");

    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not valid JSON");
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["valid"], 1);
    assert_eq!(json["summary"]["invalid"], 1);
    assert_eq!(json["results"][0]["valid"], true);
    assert_eq!(json["results"][1]["errors"][0]["code"], "R1003");
    assert_eq!(json["results"][1]["errors"][0]["location"], "GET /users/new");
}

#[test]
fn validate_requires_routes_flag() {
    trellis().arg("validate").assert().failure();
}

#[test]
fn validate_table_written_at_runtime() {
    let dir = TempDir::new().expect("tempdir");
    let table = dir.path().join("api.yaml");
    std::fs::write(
        &table,
        "routes:\n  - { method: get, path: /health }\n  - { method: get, path: /items/:id }\n",
    )
    .expect("write table");

    trellis()
        .args(["validate", "--routes"])
        .arg(&table)
        .assert()
        .success()
        .stderr(contains("is valid (2 route(s))"));
}

// ---------------------------------------------------------------------------
// trellis resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_param_route() {
    resolve("GET", "/users/42/orders/7")
        .assert()
        .success()
        .stdout(contains("200 get_user_order (/users/:id/orders/:order)"))
        .stdout(contains("id = 42"))
        .stdout(contains("order = 7"));
}

#[test]
fn resolve_catch_all_route() {
    resolve("GET", "/static/js/app.js")
        .assert()
        .success()
        .stdout(contains("filepath = /js/app.js"));
}

#[test]
fn resolve_lowercase_method() {
    resolve("get", "/users")
        .assert()
        .success()
        .stdout(contains("200 list_users"));
}

#[test]
fn resolve_trailing_slash_redirect() {
    resolve("GET", "/docs")
        .assert()
        .success()
        .stdout(contains("301 redirect to /docs/ (trailing slash)"));
}

#[test]
fn resolve_fixed_path_redirect() {
    resolve("PUT", "/USERS//42")
        .assert()
        .success()
        .stdout(contains("307 redirect to /users/42 (fixed path)"));
}

#[test]
fn resolve_method_not_allowed() {
    resolve("DELETE", "/users/42")
        .assert()
        .success()
        .stdout(contains("405 method not allowed, Allow: GET, PUT, OPTIONS"));
}

#[test]
fn resolve_options() {
    resolve("OPTIONS", "/users")
        .assert()
        .success()
        .stdout(contains("200 options, Allow: GET, POST, OPTIONS"));
}

#[test]
fn resolve_server_wide_options() {
    resolve("OPTIONS", "*")
        .assert()
        .success()
        .stdout(contains("Allow: GET, POST, PUT, OPTIONS"));
}

#[test]
fn resolve_not_found() {
    resolve("GET", "/nothing/here")
        .assert()
        .success()
        .stdout(contains("404 not found"));
}

#[test]
fn resolve_without_redirects() {
    trellis()
        .args(["resolve", "--routes"])
        .arg(fixtures().join("no-redirects.yaml"))
        .args(["--method", "GET", "--path", "/docs"])
        .assert()
        .success()
        .stdout(contains("404 not found"));

    trellis()
        .args(["resolve", "--routes"])
        .arg(fixtures().join("no-redirects.yaml"))
        .args(["--method", "POST", "--path", "/users/1"])
        .assert()
        .success()
        .stdout(contains("404 not found"));
}

#[test]
fn resolve_json_format_outputs_json() {
    let output = resolve("GET", "/users/42")
        .args(["--format", "json"])
        .output()
        .expect("failed to run trellis");

    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is not valid JSON");
    assert_eq!(json["outcome"], "found");
    assert_eq!(json["status"], 200);
    assert_eq!(json["route"], "get_user");
    assert_eq!(json["params"][0]["name"], "id");
    assert_eq!(json["params"][0]["value"], "42");
}

#[test]
fn resolve_conflicting_table_exits_one() {
    trellis()
        .args(["resolve", "--routes"])
        .arg(fixtures().join("conflict.yaml"))
        .args(["--path", "/users/1"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to register routes").and(contains("R1003")));
}

#[test]
fn resolve_missing_file_exits_one() {
    trellis()
        .args(["resolve", "--routes", "missing.yaml", "--path", "/"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("failed to load missing.yaml"));
}

// ---------------------------------------------------------------------------
// global flags
// ---------------------------------------------------------------------------

#[test]
fn json_logs_go_to_stderr() {
    resolve("GET", "/users/1")
        .args(["--log-level", "info", "--log-format", "json"])
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(contains("200 get_user"))
        .stderr(contains("\"event\":\"startup\""))
        .stderr(contains("\"event\":\"routes_loaded\""));
}

#[test]
fn version_flag() {
    trellis()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("trellis"));
}

//! Integration tests for the `jmxtree` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! config handling and error exit codes, all without a live agent.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `jmxtree` binary with env isolation.
///
/// Clears all `JMXTREE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn jmxtree_cmd() -> assert_cmd::Command {
    isolated_cmd(Path::new("/tmp/jmxtree-cli-test-nonexistent"))
}

fn isolated_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("jmxtree");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("JMXTREE_PROFILE")
        .env_remove("JMXTREE_GATEWAY")
        .env_remove("JMXTREE_USERNAME")
        .env_remove("JMXTREE_PASSWORD")
        .env_remove("JMXTREE_OUTPUT")
        .env_remove("JMXTREE_INSECURE")
        .env_remove("JMXTREE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
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
    let output = jmxtree_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(
        text.contains("Usage"),
        "Expected 'Usage' in output:\n{text}"
    );
}

#[test]
fn test_help_flag() {
    jmxtree_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("MBean tree")
            .and(predicate::str::contains("tree"))
            .and(predicate::str::contains("find"))
            .and(predicate::str::contains("can-invoke"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    jmxtree_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jmxtree"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    jmxtree_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    jmxtree_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jmxtree"));
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = jmxtree_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = jmxtree_cmd()
        .args(["--output", "yaml", "tree"])
        .output()
        .unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid output format"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_find_requires_domain() {
    jmxtree_cmd()
        .args(["find", "--prop", "type=Memory"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--domain"));
}

// ── Connection resolution ───────────────────────────────────────────

#[test]
fn test_tree_without_gateway_is_usage_error() {
    jmxtree_cmd()
        .arg("tree")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("gateway"));
}

#[test]
fn test_unknown_profile_is_not_found() {
    jmxtree_cmd()
        .args(["--profile", "nope", "tree"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_username_without_password_needs_credentials() {
    jmxtree_cmd()
        .args([
            "--gateway",
            "http://127.0.0.1:1/jolokia/",
            "--username",
            "admin",
            "tree",
        ])
        .assert()
        .code(3);
}

#[test]
fn test_unreachable_gateway_is_connection_error() {
    jmxtree_cmd()
        .args(["--gateway", "http://127.0.0.1:1/jolokia/", "--timeout", "5", "tree"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_gateway_url() {
    jmxtree_cmd()
        .args(["--gateway", "not a url", "tree"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid URL"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    // `config show` renders the default config when no file exists.
    jmxtree_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path() {
    jmxtree_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_set_creates_profile() {
    let home = tempfile::tempdir().unwrap();

    isolated_cmd(home.path())
        .args(["config", "set", "update_rate_ms", "1000"])
        .assert()
        .success();

    isolated_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));

    isolated_cmd(home.path())
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"update_rate_ms\": 1000")
                .and(predicate::str::contains("http://localhost:8778/jolokia/")),
        );
}

#[test]
fn test_config_set_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    isolated_cmd(home.path())
        .args(["config", "set", "site", "default"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_config_use_missing_profile() {
    let home = tempfile::tempdir().unwrap();
    isolated_cmd(home.path())
        .args(["config", "use", "broker"])
        .assert()
        .code(4);
}

// ── Subcommand help ─────────────────────────────────────────────────

#[test]
fn test_config_subcommands_exist() {
    jmxtree_cmd().args(["config", "--help"]).assert().success().stdout(
        predicate::str::contains("path")
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("set"))
            .and(predicate::str::contains("profiles"))
            .and(predicate::str::contains("set-password")),
    );
}

#[test]
fn test_watch_flags_exist() {
    jmxtree_cmd().args(["watch", "--help"]).assert().success().stdout(
        predicate::str::contains("--update-rate")
            .and(predicate::str::contains("--select"))
            .and(predicate::str::contains("--no-auto-refresh")),
    );
}

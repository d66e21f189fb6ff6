//! CLI integration tests for mongo-tunnel-migrate.
//!
//! These tests verify argument parsing, help output, and the failure exit
//! path when the environment is not configured. No database or tunnel is
//! required: a missing environment fails fast before any connection work.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the mongo-tunnel-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("mongo-tunnel-migrate").unwrap()
}

#[test]
fn test_help_shows_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--batch-size"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mongo-tunnel-migrate"));
}

#[test]
fn test_missing_environment_fails_with_config_error() {
    cmd()
        .env_remove("EC2_URI")
        .env_remove("SSH_USERNAME")
        .env_remove("MONGO_DB_URI")
        .env_remove("MONGO_DB_USER")
        .env_remove("MONGO_DB_PASS")
        .env_remove("OLD_MONGO_DB_CONNECTION_STRING")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_invalid_batch_size_rejected_by_clap() {
    cmd()
        .args(["--batch-size", "not-a-number"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

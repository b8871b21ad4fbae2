//! CLI argument and offline command tests for memagent

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::time::Duration;

fn env() -> TestEnv {
    TestEnv::new().expect("test env")
}

#[test]
fn test_help_flag() {
    env()
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("per-thread memory"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("engage"))
        .stdout(predicate::str::contains("smoke"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_version_flag() {
    env()
        .command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_usage() {
    env()
        .command()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_subcommand() {
    env()
        .command()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_subcommand_help() {
    let cases = [
        ("serve", "--port"),
        ("engage", "--message"),
        ("remote", "--url"),
        ("smoke", "--url"),
        ("setup", "--force"),
        ("status", "configuration"),
    ];
    let env = env();
    for (sub, expected) in cases {
        env.command()
            .args([sub, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains(expected));
    }
}

#[test]
fn test_serve_rejects_bad_port() {
    env()
        .command()
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_serve_without_api_key_fails() {
    env()
        .command()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn test_engage_without_api_key_fails() {
    env()
        .command()
        .args(["engage", "-m", "What is 2 plus 2?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn test_engage_interactive_stops_at_end_of_input() {
    env()
        .command()
        .arg("engage")
        .env("GOOGLE_API_KEY", "AIzaSyOfflineKey000001")
        .write_stdin("\n\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Interactive mode"));
}

#[test]
fn test_engage_interactive_exit_command() {
    env()
        .command()
        .args(["engage", "-t", "scratch"])
        .env("GOOGLE_API_KEY", "AIzaSyOfflineKey000001")
        .write_stdin("quit\n")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("thread 'scratch'"));
}

#[test]
fn test_status_reports_missing_key() {
    env()
        .command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("[Missing]"))
        .stdout(predicate::str::contains("[Not found]"))
        .stdout(predicate::str::contains("0.0.0.0:8000"))
        .stdout(predicate::str::contains("in memory"));
}

#[test]
fn test_status_masks_key_from_env() {
    env()
        .command()
        .arg("status")
        .env("GOOGLE_API_KEY", "AIzaSyTestKey1234567890")
        .env("PORT", "9100")
        .assert()
        .success()
        .stdout(predicate::str::contains("AIzaSyTe...7890"))
        .stdout(predicate::str::contains("AIzaSyTestKey1234567890").not())
        .stdout(predicate::str::contains(":9100"));
}

#[test]
fn test_status_rejects_invalid_env_value() {
    env()
        .command()
        .arg("status")
        .env("PORT", "eighty")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PORT"));
}

#[test]
fn test_status_reads_config_file() {
    let env = env();
    let path = env
        .write_config(r#"{"model": {"model": "gemini-test"}, "store": {"dir": "threads"}}"#)
        .unwrap();

    env.command()
        .arg("status")
        .env("MEMAGENT_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-test"))
        .stdout(predicate::str::contains("[OK]"))
        .stdout(predicate::str::contains("threads"));
}

#[test]
fn test_status_rejects_malformed_config() {
    let env = env();
    let path = env.write_config("{ not json").unwrap();

    env.command()
        .arg("status")
        .env("MEMAGENT_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_setup_writes_env_file() {
    let env = env();

    env.command()
        .args(["setup", "--api-key", "AIzaSyFromSetup0000001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("with your API key"));

    let content = std::fs::read_to_string(env.path(".env")).unwrap();
    assert!(content.contains("GOOGLE_API_KEY=AIzaSyFromSetup0000001"));
    assert!(content.contains("PORT=8000"));

    // the written .env is picked up on the next run
    env.command()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("AIzaSyFr...0001"));
}

#[test]
fn test_setup_keeps_existing_env_file() {
    let env = env();
    std::fs::write(env.path(".env"), "GOOGLE_API_KEY=original\n").unwrap();

    env.command()
        .args(["setup", "--api-key", "replacement"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    assert_eq!(
        std::fs::read_to_string(env.path(".env")).unwrap(),
        "GOOGLE_API_KEY=original\n"
    );

    env.command()
        .args(["setup", "--api-key", "replacement", "--force"])
        .assert()
        .success();
    assert!(std::fs::read_to_string(env.path(".env"))
        .unwrap()
        .contains("GOOGLE_API_KEY=replacement"));
}

#[test]
fn test_smoke_unreachable_server_fails() {
    env()
        .command()
        .args(["smoke", "--url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot reach"));
}

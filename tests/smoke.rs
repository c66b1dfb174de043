//! Smoke tests -- verify the binary runs and key subcommands load.

use assert_cmd::Command;

#[test]
fn test_cli_help() {
    Command::cargo_bin("logtriage")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Log anomaly triage"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("logtriage")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("logtriage"));
}

#[test]
fn test_classify_subcommand() {
    Command::cargo_bin("logtriage")
        .unwrap()
        .args([
            "classify",
            "Failed password for root from 192.168.1.100",
            "--score",
            "0.9",
        ])
        .assert()
        .success()
        .stdout(predicates::str::contains("High"))
        .stdout(predicates::str::contains("iptables -A INPUT -j DROP -s 192.168.1.100"));
}

#[test]
fn test_classify_windows_event() {
    Command::cargo_bin("logtriage")
        .unwrap()
        .args(["classify", "{'Event ID': '4625', 'Message': 'bad login'}"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Failed Logon (Invalid Credentials)"))
        .stdout(predicates::str::contains("Pending"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("logtriage")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success();
}

#[test]
fn test_analyze_subcommand_exists() {
    Command::cargo_bin("logtriage")
        .unwrap()
        .args(["analyze", "--help"])
        .assert()
        .success();
}

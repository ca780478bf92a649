use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `wagerbook` invocation rooted in its own temp dir with its own database.
fn wagerbook(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wagerbook").unwrap();
    cmd.current_dir(dir.path())
        .env("WAGERBOOK_DATABASE_URL", dir.path().join("cli.db"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn quote_reports_locked_payout_as_json() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["quote", "--probability", "0.5", "--amount", "100", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"quote""#))
        .stdout(predicate::str::contains(r#""potential_payout":200"#));
}

#[test]
fn quote_rejects_out_of_range_probability() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["quote", "--probability", "1.5", "--amount", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("probability"));
}

#[test]
fn config_check_fails_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["config", "check", "--config", "absent.toml"])
        .assert()
        .failure();
}

#[test]
fn config_check_accepts_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("wagerbook.toml"),
        "[engine]\nprobability_drift = \"renormalize\"\n",
    )
    .unwrap();
    wagerbook(&dir)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn config_show_prints_effective_values() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"config""#))
        .stdout(predicate::str::contains(r#""signup_bonus":1000"#));
}

#[test]
fn migrate_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir).arg("migrate").assert().success();
    assert!(dir.path().join("cli.db").exists());
}

#[test]
fn unknown_market_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["market", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("market not found"));
}

#[test]
fn audit_of_empty_database_passes() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["audit", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"audit""#));
}

#[test]
fn simulation_settles_and_audits() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args([
            "simulate", "--bettors", "4", "--bets", "10", "--outcomes", "3", "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"simulation""#))
        .stdout(predicate::str::contains(r#""violations":[]"#));
}

#[test]
fn cancelled_simulation_refunds_everyone() {
    let dir = tempfile::tempdir().unwrap();
    wagerbook(&dir)
        .args(["simulate", "--bettors", "3", "--bets", "5", "--cancel", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""account_credits":3000"#));
}

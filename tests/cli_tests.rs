//! CLI integration tests.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

fn dealflow(dir: &tempfile::TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("dealflow");
    cmd.current_dir(dir.path())
        .env_remove("DEALFLOW_PAYMENT_PHONE")
        .env_remove("TELEGRAM_BOT_TOKEN")
        .env_remove("TELEGRAM_CHAT_ID");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    dealflow(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dealflow"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("stats"))
        .stdout(predicate::str::contains("transactions"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_config_init_then_validate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    dealflow(&dir)
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    dealflow(&dir)
        .args(["config", "validate", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));

    dealflow(&dir)
        .args(["config", "init"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_check_health_fails_without_accounts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "dry_run = true\n").unwrap();

    dealflow(&dir)
        .args(["check", "health", "-c"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("source_accounts"))
        .stderr(predicate::str::contains("health checks failed"));
}

#[test]
fn test_stats_without_database_only_warns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let db = dir.path().join("never.db");
    std::fs::write(
        &path,
        format!("[database]\npath = {:?}\n", db.display().to_string()),
    )
    .unwrap();

    dealflow(&dir)
        .args(["stats", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Database not found"));
    assert!(!db.exists());
}

#[test]
fn test_invalid_config_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[workers]\npool_size = 0\n").unwrap();

    dealflow(&dir)
        .args(["config", "validate", "-c"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("pool_size"));
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn dutysync(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dutysync").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("DUTYSYNC_CONFIG")
        .env_remove("NOTION_TOKEN")
        .env_remove("SLACK_TOKEN")
        .env_remove("DATABASE_ID");
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("dutysync.yaml"), yaml).unwrap();
}

const VALID_CONFIG: &str = "timezone: UTC
notion:
  database_id: db-123
recipients:
  Alice: U111AAA
";

// ---------------------------------------------------------------------------
// dutysync check
// ---------------------------------------------------------------------------

#[test]
fn check_passes_on_valid_config() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    dutysync(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn check_reports_warnings_without_failing() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "notion:\n  database_id: db-123\n");
    dutysync(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("[warning]"))
        .stdout(predicate::str::contains("recipients table is empty"));
}

#[test]
fn check_fails_on_config_errors() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "timezone: Mars/Olympus\nnotion:\n  database_id: db-123\n",
    );
    dutysync(&dir)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] unknown timezone"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn check_emits_json() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    dutysync(&dir)
        .args(["check", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"warnings\""));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    dutysync(&dir)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn config_flag_overrides_default_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("other.yaml"), VALID_CONFIG).unwrap();
    dutysync(&dir)
        .args(["check", "--config", "other.yaml"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// dutysync run / plan (credential and argument gating; no live calls)
// ---------------------------------------------------------------------------

#[test]
fn run_without_credentials_fails_before_any_call() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    dutysync(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOTION_TOKEN"));
}

#[test]
fn plan_without_credentials_fails_the_same_way() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    dutysync(&dir)
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing credential"));
}

#[test]
fn run_rejects_a_malformed_date_override() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, VALID_CONFIG);
    dutysync(&dir)
        .args(["run", "--date", "07/29/2025"])
        .env("NOTION_TOKEN", "t")
        .env("SLACK_TOKEN", "t")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid date"));
}

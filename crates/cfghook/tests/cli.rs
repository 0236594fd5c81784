use std::fs;

use assert_cmd::Command; // Bring Command into scope
use predicates::prelude::*; // Bring predicate traits into scope
use tempfile::tempdir;

#[test]
fn test_help_lists_subcommands() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("commit"));

    Ok(())
}

#[test]
fn test_list_with_empty_plugin_dir() -> Result<(), Box<dyn std::error::Error>> {
    let plugin_dir = tempdir()?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--plugin-dir")
        .arg(plugin_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins loaded."))
        .stdout(predicate::str::contains("Backend stopped"));

    Ok(())
}

#[test]
fn test_run_once_starts_and_stops() -> Result<(), Box<dyn std::error::Error>> {
    let plugin_dir = tempdir()?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.args(["run", "--once", "--reset", "--plugin-dir"])
        .arg(plugin_dir.path())
        .args(["--", "-x", "y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend started with 0 plugin(s)"))
        .stdout(predicate::str::contains("Backend stopped"));

    Ok(())
}

#[test]
fn test_missing_plugin_dir_fails() -> Result<(), Box<dyn std::error::Error>> {
    let plugin_dir = tempdir()?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--plugin-dir")
        .arg(plugin_dir.path().join("absent"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be read"));

    Ok(())
}

#[test]
fn test_commit_change_set_file() -> Result<(), Box<dyn std::error::Error>> {
    let plugin_dir = tempdir()?;
    let changes = plugin_dir.path().join("changes.json");
    fs::write(
        &changes,
        r#"{"changes": [{"op": "add", "key": "system.hostname", "target_values": {"name": "edge"}}]}"#,
    )?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--plugin-dir")
        .arg(plugin_dir.path())
        .arg("commit")
        .arg("--changes")
        .arg(&changes)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Transaction \d+ ended: 1 change\(s\), 0 callback\(s\)")?);

    Ok(())
}

#[test]
fn test_validate_only_stops_at_completed() -> Result<(), Box<dyn std::error::Error>> {
    let plugin_dir = tempdir()?;
    let changes = plugin_dir.path().join("changes.json");
    fs::write(&changes, r#"{"changes": []}"#)?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--plugin-dir")
        .arg(plugin_dir.path())
        .args(["commit", "--validate-only", "--changes"])
        .arg(&changes)
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    Ok(())
}

#[test]
fn test_invalid_change_set_fails() -> Result<(), Box<dyn std::error::Error>> {
    let plugin_dir = tempdir()?;
    let changes = plugin_dir.path().join("changes.json");
    fs::write(&changes, "not json")?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--plugin-dir")
        .arg(plugin_dir.path())
        .arg("commit")
        .arg("--changes")
        .arg(&changes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid change set"));

    Ok(())
}

#[test]
fn test_config_file_sets_plugin_dir() -> Result<(), Box<dyn std::error::Error>> {
    let workdir = tempdir()?;
    let plugin_dir = workdir.path().join("plugins");
    fs::create_dir(&plugin_dir)?;
    let config = workdir.path().join("backend.json");
    fs::write(&config, format!(r#"{{"backend_dir": {:?}}}"#, plugin_dir.display().to_string()))?;
    let mut cmd = Command::cargo_bin("cfghookd")?;

    cmd.arg("--config")
        .arg(&config)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No plugins loaded."));

    Ok(())
}

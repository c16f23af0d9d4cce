use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Binary with an isolated config location.
fn pollwatch(temp: &TempDir) -> Result<Command> {
    let mut cmd = Command::cargo_bin("pollwatch")?;
    cmd.env("XDG_CONFIG_HOME", temp.path().join("xdg"))
        .env("HOME", temp.path())
        .env_remove("POLLWATCH_CONFIG")
        .env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn test_version() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(pollwatch::VERSION));
    Ok(())
}

#[test]
fn test_help_lists_flags() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--interval"))
        .stdout(predicate::str::contains("--keepalive"));
    Ok(())
}

#[test]
fn test_missing_path_fails() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .arg(temp.path().join("does-not-exist"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("path not found"));
    Ok(())
}

#[test]
fn test_unknown_op_fails() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .args(["--ops", "rename"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown operation"));
    Ok(())
}

#[test]
fn test_missing_config_file_fails() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
    Ok(())
}

#[test]
fn test_invalid_config_fails() -> Result<()> {
    let temp = TempDir::new()?;
    let config = temp.path().join("config.toml");
    fs::write(&config, "[watch]\ninterval = \"whenever\"\n")?;

    pollwatch(&temp)?
        .arg("--config")
        .arg(&config)
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid interval"));
    Ok(())
}

#[test]
fn test_invalid_ignore_pattern_fails() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .args(["--ignore", "(broken"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}

#[test]
fn test_missing_command_program_fails() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .args(["--cmd", "pollwatch-no-such-program"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in PATH"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_failing_start_command_exits() -> Result<()> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("a.txt"), "a")?;

    pollwatch(&temp)?
        .args(["--cmd", "sh -c 'exit 7'", "--startcmd", "--list"])
        .arg(temp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("a.txt"))
        .stderr(predicate::str::contains("Watching 2 files"))
        .stderr(predicate::str::contains("Start command failed"));
    Ok(())
}

#[test]
fn test_completions() -> Result<()> {
    let temp = TempDir::new()?;
    pollwatch(&temp)?
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pollwatch"));
    Ok(())
}

use anyhow::Result;
use scratch_harvest::EnvFile;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_start_parameters_written_in_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    EnvFile::new("2", "3")?.write_to(&path)?;

    assert_eq!(std::fs::read_to_string(&path)?, "IDENTIFIER=2\nAMOUNT=3\n");
    Ok(())
}

#[test]
fn test_rewrite_replaces_previous_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("deploy/.env");

    EnvFile::new("100", "50")?.write_to(&path)?;
    EnvFile::new("2", "3")?.write_to(&path)?;

    let env = EnvFile::read_from(&path)?;
    assert_eq!(env.identifier(), "2");
    assert_eq!(env.amount(), "3");
    Ok(())
}

#[test]
fn test_compose_env_binary() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    let output = Command::new(env!("CARGO_BIN_EXE_compose-env"))
        .args(["--identifier", "2", "--amount", "3", "--output"])
        .arg(&path)
        .env_remove("IDENTIFIER")
        .env_remove("AMOUNT")
        .output()?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(std::fs::read_to_string(&path)?, "IDENTIFIER=2\nAMOUNT=3\n");
    Ok(())
}

#[test]
fn test_compose_env_reads_make_variables_from_environment() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    let output = Command::new(env!("CARGO_BIN_EXE_compose-env"))
        .arg("--output")
        .arg(&path)
        .env("IDENTIFIER", "random")
        .env("AMOUNT", "10")
        .output()?;

    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&path)?, "IDENTIFIER=random\nAMOUNT=10\n");
    Ok(())
}

#[test]
fn test_compose_env_rejects_missing_amount() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    let output = Command::new(env!("CARGO_BIN_EXE_compose-env"))
        .args(["--identifier", "2", "--output"])
        .arg(&path)
        .env_remove("AMOUNT")
        .output()?;

    assert!(!output.status.success());
    assert!(!path.exists());
    Ok(())
}

fn make_available() -> bool {
    Command::new("make")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[test]
fn test_make_env_without_rust_toolchain() -> Result<()> {
    if !make_available() {
        return Ok(());
    }
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    let output = Command::new("make")
        .arg("-s")
        .arg("-C")
        .arg(env!("CARGO_MANIFEST_DIR"))
        .arg("env")
        .arg("IDENTIFIER=2")
        .arg("AMOUNT=3")
        .arg("CARGO=scratch-harvest-no-such-cargo")
        .arg("COMPOSE_ENV=/nonexistent/compose-env")
        .arg(format!("ENV_FILE={}", path.display()))
        .output()?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(std::fs::read_to_string(&path)?, "IDENTIFIER=2\nAMOUNT=3\n");
    Ok(())
}

#[test]
fn test_make_env_uses_prebuilt_helper() -> Result<()> {
    if !make_available() {
        return Ok(());
    }
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    let output = Command::new("make")
        .arg("-s")
        .arg("-C")
        .arg(env!("CARGO_MANIFEST_DIR"))
        .arg("env")
        .arg("IDENTIFIER=random")
        .arg("AMOUNT=10")
        .arg("CARGO=scratch-harvest-no-such-cargo")
        .arg(format!("COMPOSE_ENV={}", env!("CARGO_BIN_EXE_compose-env")))
        .arg(format!("ENV_FILE={}", path.display()))
        .output()?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(std::fs::read_to_string(&path)?, "IDENTIFIER=random\nAMOUNT=10\n");
    Ok(())
}

#[test]
fn test_make_env_requires_both_values() -> Result<()> {
    if !make_available() {
        return Ok(());
    }
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join(".env");

    let output = Command::new("make")
        .arg("-s")
        .arg("-C")
        .arg(env!("CARGO_MANIFEST_DIR"))
        .arg("env")
        .arg("IDENTIFIER=2")
        .arg("AMOUNT=")
        .arg(format!("ENV_FILE={}", path.display()))
        .output()?;

    assert!(!output.status.success());
    assert!(!path.exists());
    Ok(())
}

//! End-to-end tests of the mkdmg binary in dry-run mode.

use assert_cmd::Command;
use predicates::prelude::*;

fn mkdmg() -> Command {
    let mut cmd = Command::cargo_bin("mkdmg").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn dry_run_succeeds_without_touching_the_system() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("MyApp.dmg");

    mkdmg()
        .args(["--dry-run", output.to_str().unwrap(), "src"])
        .assert()
        .success();

    assert!(!output.exists());
}

#[test]
fn verbose_dry_run_reports_commands() {
    mkdmg()
        .args(["-v", "-s", "--sandbox-safe", "--bless", "out.dmg", "src"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Simulating hdiutil makehybrid"))
        .stderr(predicate::str::contains("Skipping blessing on sandbox safe images"))
        .stderr(predicate::str::contains("DMG created successfully: out.dmg"));
}

#[test]
fn wrong_extension_fails() {
    mkdmg()
        .args(["-s", "out.img", "src"])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("mkdmg: "))
        .stderr(predicate::str::contains("must have a .dmg extension"));
}

#[test]
fn sandbox_safe_apfs_fails() {
    mkdmg()
        .args(["-s", "--sandbox-safe", "--apfs", "out.dmg", "src"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "creating an APFS disk image that is sandbox safe is not supported",
        ));
}

#[test]
fn unknown_format_fails() {
    mkdmg()
        .args(["-s", "--format", "ZIP", "out.dmg", "src"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid image format: ZIP"));
}

#[test]
fn missing_source_dir_fails() {
    mkdmg()
        .args(["-s", "out.dmg"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing required argument: SOURCE_DIR"));
}

#[test]
fn config_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mkdmg.json");
    std::fs::write(
        &config,
        r#"{"output_path": "FromFile.dmg", "source_dir": "src", "simulate": true}"#,
    )
    .unwrap();

    mkdmg()
        .args(["-v", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("-volname FromFile"));
}

#[test]
fn malformed_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mkdmg.json");
    std::fs::write(&config, "{not json").unwrap();

    mkdmg()
        .args(["--config", config.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("loading config file"));
}

#[test]
fn help_and_version_exit_zero() {
    mkdmg()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sandbox-safe"));

    mkdmg()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

use std::process::{Command, Output};
use tempfile::TempDir;

/// Integration tests for BranchSentry CLI commands
/// These tests run the actual binary and verify its behavior

const ENV_OVERRIDES: [&str; 5] = [
    "GITHUB_SECRET_NAME",
    "SENDER_EMAIL",
    "RECIPIENT_EMAIL",
    "MAIL_API_KEY",
    "GITHUB_TOKEN",
];

fn branchsentry(args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_branchsentry"));
    command.args(args);
    for key in ENV_OVERRIDES {
        command.env_remove(key);
    }
    command.output().expect("Failed to execute branchsentry")
}

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("config.yml");
    std::fs::write(&path, content).expect("Failed to write test config");
    path.to_string_lossy().into_owned()
}

#[test]
fn test_cli_help() {
    let output = branchsentry(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    // Verify help contains expected commands
    assert!(stdout.contains("run"));
    assert!(stdout.contains("preview"));
    assert!(stdout.contains("init"));
    assert!(stdout.contains("doctor"));
}

#[test]
fn test_cli_version() {
    let output = branchsentry(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("branchsentry"));
}

#[test]
fn test_help_subcommands() {
    for cmd in ["run", "preview", "init", "doctor"] {
        let output = branchsentry(&[cmd, "--help"]);

        assert!(output.status.success(), "Help for {} command failed", cmd);
        assert!(!output.stdout.is_empty(), "Help output for {} was empty", cmd);
    }

    let stdout = String::from_utf8_lossy(&branchsentry(&["run", "--help"]).stdout).to_string();
    assert!(stdout.contains("--format"));
    assert!(stdout.contains("--no-staleness"));
}

#[test]
fn test_invalid_command() {
    let output = branchsentry(&["nonexistent-command"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error") || stderr.contains("unrecognized"));
}

#[test]
fn test_run_without_addresses_fails_with_json_outcome() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "github:\n  secret_name: \"github-token\"\n");

    let output = branchsentry(&["--config", &config, "run"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let outcome: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("stdout is a JSON outcome");
    assert_eq!(outcome["statusCode"], 500);
    assert!(outcome["body"]
        .as_str()
        .unwrap()
        .contains("SENDER_EMAIL"));
}

#[test]
fn test_run_with_missing_secret_fails_before_scanning() {
    let dir = TempDir::new().unwrap();
    let secrets = dir.path().join("secrets");
    std::fs::create_dir_all(&secrets).unwrap();
    let config = write_config(
        &dir,
        &format!(
            "github:\n  secret_name: \"bs-it-missing\"\n  secrets_dir: {:?}\nmail:\n  sender: \"a@example.com\"\n  recipient: \"b@example.com\"\n",
            secrets
        ),
    );

    let output = branchsentry(&["--config", &config, "run"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"statusCode\":500"));
    assert!(stdout.contains("bs-it-missing"));
}

#[test]
fn test_error_handling_invalid_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "invalid: yaml: content: [");

    let output = branchsentry(&["--config", &config, "run"]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("parse") || stdout.contains("config"));
}

#[test]
fn test_init_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yml");
    let path_str = path.to_string_lossy().to_string();

    let output = branchsentry(&["--config", &path_str, "init"]);

    assert!(output.status.success());
    let written = std::fs::read_to_string(&path).expect("config written");
    assert!(written.contains("primary_branch: main"));
    assert!(written.contains("format: hierarchical"));

    // second init without --force leaves the file alone
    std::fs::write(&path, "scan:\n  primary_branch: trunk\n").unwrap();
    let output = branchsentry(&["--config", &path_str, "init"]);
    assert!(output.status.success());
    assert!(std::fs::read_to_string(&path).unwrap().contains("trunk"));
}

#[test]
fn test_doctor_reports_incomplete_config() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "report:\n  format: flat\n");

    let output = branchsentry(&["--config", &config, "doctor"]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diagnostics"));
    assert!(stdout.contains("Configuration incomplete"));
}

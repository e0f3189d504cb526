//! CLI smoke tests for the taskd-server binary
//!
//! These tests verify that the CLI commands work correctly, including
//! configuration validation, help output, and a short live run.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Helper to run the taskd-server binary with given arguments
fn run_taskd_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_taskd-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute taskd-server")
}

/// Write a config whose home_dir points into `dir`, plus any extra YAML.
fn write_config(dir: &Path, extra: &str) -> String {
    let config_path = dir.join("taskd.yaml");
    let content = format!(
        "server:\n  home_dir: \"{}\"\n{}",
        dir.join("home").to_string_lossy().replace('\\', "/"),
        extra
    );
    std::fs::write(&config_path, content).expect("Failed to write config file");
    config_path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_taskd_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("taskd-server"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--mock"), "Should mention mock option");
}

#[test]
fn test_cli_version_command() {
    let output = run_taskd_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("taskd-server"), "Should contain binary name");
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_taskd_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("unrecognized"),
        "Should contain error message about invalid command"
    );
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_taskd_server(&["--config", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config file not found"),
        "Should mention config file issue: {}",
        stderr
    );
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");

    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_taskd_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
}

#[test]
fn test_cli_config_validation_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        r#"
database:
  url: "sqlite://database/tasks.db"

logging:
  level: "warn"
  format: "text"

modules:
  tasks:
    default_page_size: 10
"#,
    );

    let output = run_taskd_server(&["--config", &config_path, "check"]);

    if !output.status.success() {
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
        eprintln!("STDOUT: {}", String::from_utf8_lossy(&output.stdout));
    }
    assert!(output.status.success(), "Should succeed with valid config");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"), "{stdout}");
    assert!(stdout.contains("default_page_size: 10"), "{stdout}");
}

#[test]
fn test_cli_check_rejects_bad_module_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        r#"
modules:
  tasks:
    default_page_size: 500
"#,
    );

    let output = run_taskd_server(&["--config", &config_path, "check"]);

    assert!(!output.status.success(), "default_page_size above the max must fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("default_page_size"), "{stderr}");
}

#[test]
fn test_cli_mock_flag_skips_database_checks() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        r#"
database:
  url: "postgresql://localhost/nonexistent"
"#,
    );

    let output = run_taskd_server(&["--config", &config_path, "check"]);
    assert!(!output.status.success(), "Non-sqlite DSN should fail without --mock");

    let output = run_taskd_server(&["--config", &config_path, "--mock", "check"]);
    assert!(
        output.status.success(),
        "Should succeed with --mock: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_print_config_applies_overrides() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "");

    let output = run_taskd_server(&["--config", &config_path, "--port", "9123", "-v", "--print-config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9123"), "{stdout}");
    assert!(stdout.contains("level: debug"), "{stdout}");
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_taskd_server(&["run", "--help"]);
    assert!(output.status.success(), "Run subcommand help should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Start the server"));

    let output = run_taskd_server(&["check", "--help"]);
    assert!(output.status.success(), "Check subcommand help should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Check configuration"));
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("Failed to find a free port")
}

/// Raw HTTP/1.1 call; returns the full response text.
async fn http_call(port: u16, method: &str, path: &str, body: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await?;
    Ok(response)
}

#[tokio::test]
async fn test_cli_run_serves_rpc_until_killed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        r#"
database:
  url: "sqlite://database/tasks.db"

logging:
  level: "warn"
"#,
    );
    let port = free_port();

    let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_taskd-server"))
        .args(["--config", &config_path, "--port", &port.to_string(), "run"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn taskd-server");

    let mut health = None;
    for _ in 0..50 {
        if let Ok(resp) = http_call(port, "GET", "/tasks.v1.TaskService/HealthCheck", "").await {
            health = Some(resp);
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    let health = health.expect("server did not come up");
    assert!(health.starts_with("HTTP/1.1 200"), "{health}");
    assert!(health.contains("\"status\":\"ok\""), "{health}");
    assert!(health.to_ascii_lowercase().contains("x-request-id"), "{health}");

    let created = http_call(
        port,
        "POST",
        "/tasks.v1.TaskService/CreateTask",
        r#"{"title":"Buy milk"}"#,
    )
    .await
    .unwrap();
    assert!(created.starts_with("HTTP/1.1 200"), "{created}");
    assert!(created.contains("\"title\":\"Buy milk\""), "{created}");

    let missing = http_call(
        port,
        "POST",
        "/tasks.v1.TaskService/GetTask",
        r#"{"id":"does-not-exist"}"#,
    )
    .await
    .unwrap();
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");
    assert!(missing.contains("\"code\":\"not_found\""), "{missing}");

    assert!(temp_dir.path().join("home/database/tasks.db").exists());

    child.kill().await.expect("Failed to stop taskd-server");
}

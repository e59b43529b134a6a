use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a test command isolated from the caller's environment
fn rescalectl() -> Command {
    let mut cmd = Command::cargo_bin("rescalectl").unwrap();
    cmd.env_remove("RESCALE_API_KEY")
        .env_remove("RESCALE_API_URL")
        .env_remove("RESCALE_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("apiconfig");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help_flag() {
    rescalectl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rescale HPC platform"))
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_version_flag() {
    rescalectl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rescalectl"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_shows_help() {
    rescalectl()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_invalid_subcommand() {
    rescalectl()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_jobs_help_lists_commands() {
    rescalectl()
        .args(["jobs", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wait"))
        .stdout(predicate::str::contains("metrics"))
        .stdout(predicate::str::contains("connection"));
}

#[test]
fn test_storage_upload_requires_a_source() {
    rescalectl()
        .args(["storage", "upload", "sd1", "inputs/a.dat"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_unknown_profile_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[default]\napikey = \"k\"\n");

    rescalectl()
        .arg("--config-file")
        .arg(&config)
        .args(["--profile", "missing", "coretypes"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown profile name: missing"));
}

#[test]
fn test_corrupt_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[[[broken");

    rescalectl()
        .arg("--config-file")
        .arg(&config)
        .arg("coretypes")
        .assert()
        .failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_coretypes_against_mock_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/coretypes/"))
        .and(header("Authorization", "Token cli-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"name": "Emerald", "code": "emerald", "cores": [1, 2]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        &format!("[default]\napikey = \"cli-key\"\napiurl = \"{}/api/v3\"\n", server.uri()),
    );

    let assert = rescalectl()
        .arg("--config-file")
        .arg(&config)
        .arg("coretypes")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed, json!([{"name": "Emerald", "code": "emerald"}]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_env_key_overrides_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/jobs/"))
        .and(header("Authorization", "Token from-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"id": "j1", "name": "run"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[default]\napikey = \"from-file\"\n");

    rescalectl()
        .env("RESCALE_API_KEY", "from-env")
        .env("RESCALE_API_URL", format!("{}/api/v3/", server.uri()))
        .arg("--config-file")
        .arg(&config)
        .args(["jobs", "running"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"j1\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_job_download_keeps_files_inside_dir() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/jobs/j1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "j1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/jobs/j1/files/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"id": "f1", "name": "../escaped.bin"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/files/f1/contents/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        &format!("[default]\napikey = \"k\"\napiurl = \"{}/api/v3/\"\n", server.uri()),
    );
    let out = dir.path().join("work").join("results");

    rescalectl()
        .arg("--config-file")
        .arg(&config)
        .args(["jobs", "download", "j1", "--dir"])
        .arg(&out)
        .assert()
        .success();

    assert_eq!(std::fs::read(out.join("escaped.bin")).unwrap(), b"payload");
    assert!(!dir.path().join("work").join("escaped.bin").exists());
}
